//! Solver backends.
//!
//! [`DampedBackend`] is the default: a self-contained Levenberg-Marquardt
//! style damped Gauss-Newton loop with an accept/reject step policy.
//! [`LmBackend`] delegates to the `levenberg-marquardt` crate behind the same
//! trait, mainly as a cross-check.

mod damped;
mod lm;

pub use damped::DampedBackend;
pub use lm::LmBackend;
