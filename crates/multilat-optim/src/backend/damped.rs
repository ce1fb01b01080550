use crate::traits::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};
use log::debug;
use multilat_core::Real;
use nalgebra::DVector;

/// Damped Gauss-Newton (Levenberg-Marquardt style) backend.
///
/// At each iteration the normal equations are damped with
/// `(JᵀJ + λ·diag(JᵀJ)) Δ = −Jᵀr` and the step is accepted only if it
/// reduces the cost; rejected steps raise `λ` and retry. Convergence is
/// declared on gradient, cost or step-size tolerances (`ftol` bounds both
/// the relative cost reduction and the cost itself, see
/// [`SolveOptions::ftol`]). If no
/// acceptable step exists even at saturated damping, the backend stops with
/// `converged = false`, so callers can tell a solution from a stall.
#[derive(Debug, Default, Clone)]
pub struct DampedBackend;

const LAMBDA_INIT: Real = 1e-3;
const LAMBDA_UP: Real = 10.0;
const LAMBDA_DOWN: Real = 0.3;
const LAMBDA_MAX: Real = 1e12;
const LAMBDA_MIN: Real = 1e-12;
const MAX_REJECTS_PER_ITER: usize = 12;

impl NllsSolverBackend for DampedBackend {
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> (DVector<Real>, SolveReport) {
        let n = problem.num_params();
        let mut x = x0;
        let mut r = problem.residuals(&x);
        let mut cost = r.norm_squared();
        let mut lambda = LAMBDA_INIT;

        let mut converged = cost <= opts.ftol;
        let mut iterations = 0usize;

        while !converged && iterations < opts.max_iters {
            iterations += 1;

            let j = problem.jacobian(&x);
            let jt = j.transpose();
            let jtj = &jt * &j;
            let neg_grad = -(&jt * &r);

            if neg_grad.amax() <= opts.gtol {
                converged = true;
                break;
            }

            let mut accepted = false;
            for _ in 0..MAX_REJECTS_PER_ITER {
                let mut damped = jtj.clone();
                for i in 0..n {
                    // Marquardt scaling keeps the damping meaningful when the
                    // diagonal entries differ by orders of magnitude.
                    damped[(i, i)] += lambda * jtj[(i, i)].max(LAMBDA_MIN);
                }

                let Some(step) = damped.lu().solve(&neg_grad) else {
                    lambda = (lambda * LAMBDA_UP).min(LAMBDA_MAX);
                    continue;
                };

                let x_new = &x + &step;
                let r_new = problem.residuals(&x_new);
                let cost_new = r_new.norm_squared();

                if cost_new.is_finite() && cost_new < cost {
                    let rel_decrease = (cost - cost_new) / cost.max(Real::MIN_POSITIVE);
                    let small_step = step.norm() <= opts.xtol * (x.norm() + opts.xtol);

                    x = x_new;
                    r = r_new;
                    cost = cost_new;
                    lambda = (lambda * LAMBDA_DOWN).max(LAMBDA_MIN);
                    accepted = true;

                    if cost <= opts.ftol || rel_decrease <= opts.ftol || small_step {
                        converged = true;
                    }
                    break;
                }

                lambda *= LAMBDA_UP;
                if lambda > LAMBDA_MAX {
                    break;
                }
            }

            if opts.verbose {
                debug!(
                    "damped-gn iter {iterations}: cost={cost:.6e} lambda={lambda:.3e} accepted={accepted}"
                );
            }

            if !accepted {
                // Damping saturated without an improving step; report a stall
                // rather than pretending the iterate is a solution.
                break;
            }
        }

        (
            x,
            SolveReport {
                iterations,
                final_cost: cost,
                converged,
            },
        )
    }
}
