use multilat_core::Real;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Generic nonlinear least-squares problem with dense parameter and residual
/// vectors.
///
/// Residuals are expected to be pre-weighted: any per-row uncertainty is
/// folded into both `residuals` and the matching `jacobian` rows by the
/// problem itself.
pub trait NllsProblem {
    /// Number of parameters in the optimization vector.
    fn num_params(&self) -> usize;
    /// Number of residual rows in the problem.
    fn num_residuals(&self) -> usize;

    /// Weighted residual vector at `x`.
    fn residuals(&self, x: &DVector<Real>) -> DVector<Real>;
    /// Weighted Jacobian at `x` (rows match `residuals`).
    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real>;
}

/// Solver termination settings shared by all backends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Maximum number of solver iterations before giving up.
    pub max_iters: usize,
    /// Cost tolerance. Convergence is declared when the relative cost
    /// reduction of an accepted step falls to this value or below, or when
    /// the cost itself does — a start already at the solution therefore
    /// converges in zero iterations.
    pub ftol: Real,
    /// Relative tolerance on parameter updates.
    pub xtol: Real,
    /// Gradient (Jᵀr) infinity-norm tolerance.
    pub gtol: Real,
    /// Emit a per-iteration `log::debug!` trace.
    pub verbose: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
            verbose: false,
        }
    }
}

/// What a backend did with a problem.
///
/// `converged == false` means the backend gave up (iteration budget exhausted
/// or no acceptable step found); the returned iterate must not be treated as
/// a valid solution in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveReport {
    pub iterations: usize,
    pub final_cost: Real,
    pub converged: bool,
}

/// A dense NLLS solver.
pub trait NllsSolverBackend {
    /// Minimize `problem` starting from `x0`. Always returns the best iterate
    /// found together with a report; inspect [`SolveReport::converged`].
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> (DVector<Real>, SolveReport);
}
