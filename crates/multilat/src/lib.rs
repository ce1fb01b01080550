//! High-level entry crate for the `multilat` positioning toolbox.
//!
//! `multilat` estimates the unknown 2D/3D position of a receiver from
//! readings collected against radio sources of known (possibly uncertain)
//! location. Readings may carry a direct range, an RSSI value, or both; RSSI
//! is converted to an equivalent distance through a free-space path-loss
//! model before everything is fused by an iterative weighted least-squares
//! solve that also propagates uncertainty into a position covariance.
//!
//! ```no_run
//! use multilat::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sources: Vec<LocatedRadioSource3d> = /* surveyed source catalog */
//! # vec![];
//! let fingerprint: Fingerprint = /* readings at the unknown position */
//! # Fingerprint::new();
//!
//! let estimator = PositionEstimator3d::with_config(sources, fingerprint)?;
//! let result = estimator.estimate()?;
//!
//! println!("position: {:?}", result.position);
//! if let Some(cov) = result.covariance {
//!     println!("covariance: {cov}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module organization
//!
//! - [`core`]: math aliases, source/reading model, path-loss propagation,
//!   synthetic scenarios
//! - [`linear`]: closed-form multilateration used for seeding
//! - [`optim`]: the NLLS problem/backend layer and the range problem
//! - [`pipeline`]: the distance deriver and the estimator façade
//! - [`prelude`]: convenient re-exports for common use cases
//!
//! ## Stability
//!
//! The `multilat` crate is the public compatibility boundary. Lower-level
//! crates are intended for advanced usage and may evolve more quickly.

/// Math aliases, source/reading model, propagation, synthetic scenarios.
pub mod core {
    pub use multilat_core::*;
}

/// Closed-form initialization (linear multilateration, centroid).
pub mod linear {
    pub use multilat_linear::*;
}

/// Nonlinear least-squares problems and solver backends.
pub mod optim {
    pub use multilat_optim::*;
}

/// Distance derivation and the estimator façade.
pub mod pipeline {
    pub use multilat_pipeline::*;
}

/// Convenient re-exports for common use cases.
///
/// Import with `use multilat::prelude::*;` to get started quickly.
pub mod prelude {
    pub use crate::core::{
        Fingerprint, LocatedRadioSource, LocatedRadioSource2d, LocatedRadioSource3d, Pt2, Pt3,
        RadioSource, Reading, Real,
    };
    pub use crate::optim::{SolveOptions, SolveReport};
    pub use crate::pipeline::{
        EstimationListener, EstimationResult, EstimatorError, EstimatorOptions, EstimatorState,
        PositionEstimator, PositionEstimator2d, PositionEstimator3d,
    };
}
