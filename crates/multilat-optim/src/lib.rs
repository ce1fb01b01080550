//! Nonlinear weighted least-squares position refinement.
//!
//! The crate is split into a small generic layer and one concrete problem:
//! - [`traits`]: the dense NLLS problem/backend abstraction,
//! - [`backend`]: a self-contained damped Gauss-Newton backend plus a wrapper
//!   around the `levenberg-marquardt` crate,
//! - [`problems::range`]: the range-based position problem, its analytic
//!   Jacobian, and the covariance estimate at the solution.

pub mod backend;
pub mod problems;
pub mod traits;

pub use backend::{DampedBackend, LmBackend};
pub use problems::range::{
    solve_range_problem, RangeEstimate, RangeObservation, RangeProblem, SolveError,
};
pub use traits::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};
