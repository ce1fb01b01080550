//! Core types for the `multilat` positioning toolbox.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Pt2`, `Pt3`, ...),
//! - the radio source and reading model ([`RadioSource`], [`Reading`],
//!   [`Fingerprint`]),
//! - the free-space path-loss propagation model used to turn RSSI
//!   observations into distances ([`propagation`]),
//! - deterministic synthetic scenario builders for tests and examples.
//!
//! Measurement pipeline:
//! `readings + located sources → (distance, σ) rows → nonlinear solve`
//!
//! The solve itself lives in `multilat-optim`; this crate only defines the
//! observation side of the problem.

/// Linear algebra type aliases and physical constants.
pub mod math;
/// Radio source and reading model.
pub mod models;
/// Free-space path-loss propagation model.
pub mod propagation;
/// Synthetic scenario builders for tests and examples.
pub mod synthetic;

pub use math::*;
pub use models::*;
