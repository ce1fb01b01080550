//! Closed-form multilateration.
//!
//! This crate provides the non-iterative position estimates used to seed the
//! nonlinear refinement in `multilat-optim`: a linear least-squares
//! multilateration solve and a centroid fallback. Neither weights rows by
//! their uncertainty; accuracy is a job for the refinement step.

pub mod multilateration;

pub use multilateration::{centroid, linear_multilateration, LinearError};
