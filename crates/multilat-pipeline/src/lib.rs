//! Position estimation pipeline.
//!
//! Ties the lower layers together behind a single façade:
//! heterogeneous readings are turned into weighted `(distance, σ)` rows by
//! the [`deriver`], and [`PositionEstimator`] drives seeding, the nonlinear
//! solve, and lifecycle notifications while enforcing the readiness and
//! locking rules.

pub mod deriver;
pub mod error;
pub mod estimator;

pub use deriver::{derive_rows, DerivedRow};
pub use error::EstimatorError;
pub use estimator::{
    EstimationListener, EstimationResult, EstimatorOptions, EstimatorState, PositionEstimator,
    PositionEstimator2d, PositionEstimator3d,
};
