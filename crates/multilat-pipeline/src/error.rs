use multilat_optim::SolveError;
use thiserror::Error;

/// Estimator error surface.
///
/// Every failure mode surfaces to the caller; the only partial-success
/// outcome is an absent covariance on an otherwise valid estimate, which is
/// not an error.
#[derive(Debug, Error)]
pub enum EstimatorError {
    /// Invalid configuration argument, raised eagerly at the mutator that
    /// caused it.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// `estimate()` called without enough usable observation rows; recover by
    /// reconfiguring and retrying.
    #[error("estimator is not ready: {0}")]
    NotReady(&'static str),
    /// Mutator (or reentrant `estimate()`) called while an estimate is in
    /// progress; wait for the current call to return.
    #[error("estimator is locked while an estimate is in progress")]
    Locked,
    /// The nonlinear solve failed; the estimator is back in an unlocked,
    /// stable state and may be retried with different inputs.
    #[error("estimation failed: {0}")]
    Estimation(#[from] SolveError),
}
