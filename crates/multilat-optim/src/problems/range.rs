//! Range-based position problem.
//!
//! Given `N ≥ D + 1` observations `(sourcePosition_i, distance_i, σ_i)`, find
//! the position `p` minimizing
//!
//! `Σ_i [ (‖p − sourcePosition_i‖ − distance_i) / σ_i ]²`
//!
//! The Jacobian is analytic: the derivative of the Euclidean distance with
//! respect to the position is the unit vector from the source to `p`, scaled
//! by `1/σ_i` for the weighted residual.

use crate::traits::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};
use crate::DampedBackend;
use multilat_core::Real;
use nalgebra::{DMatrix, DVector, Point, SMatrix, SVector};
use thiserror::Error;

/// Guard against the undefined distance gradient at `p == sourcePosition`.
const MIN_RANGE: Real = 1e-12;

/// Relative condition threshold below which `JᵀJ` is treated as singular and
/// no covariance is reported.
const COND_EPS: Real = 1e-12;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("need at least {needed} usable observations, got {got}")]
    TooFewRows { needed: usize, got: usize },
    #[error("invalid observation {index}: {reason}")]
    InvalidRow { index: usize, reason: String },
    #[error("solver did not converge after {iterations} iterations (final cost {final_cost:.3e})")]
    DidNotConverge { iterations: usize, final_cost: Real },
}

/// One weighted range observation.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeObservation<const D: usize> {
    /// Known position of the source the range was measured against.
    pub position: Point<Real, D>,
    /// Observed distance to the source.
    pub distance: Real,
    /// Standard deviation of the observed distance.
    pub std_dev: Real,
}

/// Weighted range problem over the `D` position unknowns.
#[derive(Debug, Clone)]
pub struct RangeProblem<const D: usize> {
    rows: Vec<RangeObservation<D>>,
}

impl<const D: usize> RangeProblem<D> {
    /// Minimum number of observations for a solvable problem with at least
    /// one degree of freedom left for the residual variance estimate.
    pub const MIN_ROWS: usize = D + 1;

    /// Build a problem from observations.
    ///
    /// # Errors
    ///
    /// Fails when fewer than `D + 1` rows are supplied or any row has a
    /// non-positive/non-finite distance or standard deviation.
    pub fn new(rows: Vec<RangeObservation<D>>) -> Result<Self, SolveError> {
        if rows.len() < Self::MIN_ROWS {
            return Err(SolveError::TooFewRows {
                needed: Self::MIN_ROWS,
                got: rows.len(),
            });
        }
        for (index, row) in rows.iter().enumerate() {
            if !(row.distance.is_finite() && row.distance > 0.0) {
                return Err(SolveError::InvalidRow {
                    index,
                    reason: format!("distance must be finite and positive, got {}", row.distance),
                });
            }
            if !(row.std_dev.is_finite() && row.std_dev > 0.0) {
                return Err(SolveError::InvalidRow {
                    index,
                    reason: format!(
                        "standard deviation must be finite and positive, got {}",
                        row.std_dev
                    ),
                });
            }
        }
        Ok(Self { rows })
    }

    /// Observations backing this problem.
    pub fn rows(&self) -> &[RangeObservation<D>] {
        &self.rows
    }

    fn point_from(x: &DVector<Real>) -> Point<Real, D> {
        Point::from(SVector::<Real, D>::from_iterator(x.iter().copied()))
    }

    /// Estimated position covariance at the solution `x`:
    /// `σ̂²·(JᵀJ)⁻¹` with `σ̂² = ‖r‖²/(N − D)`.
    ///
    /// Returns `None` when `JᵀJ` is singular or near-singular (degenerate
    /// source geometry), rather than a meaningless matrix.
    pub fn covariance_at(&self, x: &DVector<Real>) -> Option<SMatrix<Real, D, D>> {
        let j = self.jacobian(x);
        let r = self.residuals(x);
        let jtj = j.transpose() * &j;

        let singular_values = jtj.clone().svd(false, false).singular_values;
        let s_max = singular_values.iter().copied().fold(0.0, Real::max);
        let s_min = singular_values.iter().copied().fold(Real::INFINITY, Real::min);
        if s_max <= 0.0 || s_min <= COND_EPS * s_max {
            return None;
        }

        let inv = jtj.try_inverse()?;
        let dof = (self.rows.len() - D).max(1) as Real;
        let sigma2 = r.norm_squared() / dof;

        let scaled = inv * sigma2;
        Some(SMatrix::from_iterator(scaled.iter().copied()))
    }
}

impl<const D: usize> NllsProblem for RangeProblem<D> {
    fn num_params(&self) -> usize {
        D
    }

    fn num_residuals(&self) -> usize {
        self.rows.len()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let p = Self::point_from(x);
        DVector::from_iterator(
            self.rows.len(),
            self.rows
                .iter()
                .map(|row| ((p - row.position).norm() - row.distance) / row.std_dev),
        )
    }

    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        let p = Self::point_from(x);
        let mut j = DMatrix::zeros(self.rows.len(), D);
        for (i, row) in self.rows.iter().enumerate() {
            let diff = p - row.position;
            let dist = diff.norm().max(MIN_RANGE);
            for c in 0..D {
                j[(i, c)] = diff[c] / (dist * row.std_dev);
            }
        }
        j
    }
}

/// Result of a range solve.
#[derive(Debug, Clone)]
pub struct RangeEstimate<const D: usize> {
    /// Estimated position.
    pub position: Point<Real, D>,
    /// Estimated position covariance, absent for degenerate geometry.
    pub covariance: Option<SMatrix<Real, D, D>>,
    /// Backend report (iterations, final cost).
    pub report: SolveReport,
}

/// Solve a range problem from `seed` with the given backend.
///
/// # Errors
///
/// [`SolveError::DidNotConverge`] when the backend gives up; the estimator
/// never silently returns the last iterate as a solution.
pub fn solve_range_problem<const D: usize, B: NllsSolverBackend>(
    problem: &RangeProblem<D>,
    seed: &Point<Real, D>,
    backend: &B,
    opts: &SolveOptions,
) -> Result<RangeEstimate<D>, SolveError> {
    let x0 = DVector::from_iterator(D, seed.coords.iter().copied());
    let (x, report) = backend.solve(problem, x0, opts);

    if !report.converged {
        return Err(SolveError::DidNotConverge {
            iterations: report.iterations,
            final_cost: report.final_cost,
        });
    }

    Ok(RangeEstimate {
        position: RangeProblem::<D>::point_from(&x),
        covariance: problem.covariance_at(&x),
        report,
    })
}

impl<const D: usize> RangeProblem<D> {
    /// Solve with the default [`DampedBackend`].
    pub fn solve(
        &self,
        seed: &Point<Real, D>,
        opts: &SolveOptions,
    ) -> Result<RangeEstimate<D>, SolveError> {
        solve_range_problem(self, seed, &DampedBackend, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multilat_core::Pt2;

    fn square_problem(truth: Pt2) -> RangeProblem<2> {
        let positions = [
            Pt2::new(0.0, 0.0),
            Pt2::new(10.0, 0.0),
            Pt2::new(0.0, 10.0),
            Pt2::new(10.0, 10.0),
        ];
        let rows = positions
            .iter()
            .map(|s| RangeObservation {
                position: *s,
                distance: (truth - s).norm(),
                std_dev: 1.0,
            })
            .collect();
        RangeProblem::new(rows).unwrap()
    }

    #[test]
    fn rejects_too_few_rows() {
        let rows = vec![RangeObservation {
            position: Pt2::new(0.0, 0.0),
            distance: 1.0,
            std_dev: 1.0,
        }];
        assert!(matches!(
            RangeProblem::new(rows),
            Err(SolveError::TooFewRows { needed: 3, got: 1 })
        ));
    }

    #[test]
    fn rejects_non_positive_distance() {
        let mut rows = square_problem(Pt2::new(5.0, 5.0)).rows().to_vec();
        rows[2].distance = 0.0;
        assert!(matches!(
            RangeProblem::new(rows),
            Err(SolveError::InvalidRow { index: 2, .. })
        ));
    }

    #[test]
    fn residuals_vanish_at_truth() {
        let truth = Pt2::new(3.0, 4.0);
        let problem = square_problem(truth);
        let x = DVector::from_vec(vec![truth.x, truth.y]);
        assert!(problem.residuals(&x).norm() < 1e-12);
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let problem = square_problem(Pt2::new(5.0, 5.0));
        let x = DVector::from_vec(vec![2.0, 3.0]);
        let j = problem.jacobian(&x);

        let eps = 1e-7;
        let r0 = problem.residuals(&x);
        for c in 0..2 {
            let mut xp = x.clone();
            xp[c] += eps;
            let rp = problem.residuals(&xp);
            for i in 0..problem.num_residuals() {
                let numeric = (rp[i] - r0[i]) / eps;
                assert!(
                    (numeric - j[(i, c)]).abs() < 1e-5,
                    "J[{i},{c}]: numeric {numeric} vs analytic {}",
                    j[(i, c)]
                );
            }
        }
    }

    #[test]
    fn weighted_rows_scale_residuals() {
        let truth = Pt2::new(5.0, 5.0);
        let mut rows = square_problem(truth).rows().to_vec();
        for row in &mut rows {
            row.std_dev = 2.0;
        }
        let problem = RangeProblem::new(rows).unwrap();
        let x = DVector::from_vec(vec![1.0, 1.0]);
        let r_scaled = problem.residuals(&x);
        let r_unit = square_problem(truth).residuals(&x);
        assert!((r_scaled.norm() * 2.0 - r_unit.norm()).abs() < 1e-12);
    }

    #[test]
    fn covariance_absent_for_collinear_sources() {
        let rows: Vec<_> = (0..4)
            .map(|i| RangeObservation {
                position: Pt2::new(i as Real, 0.0),
                distance: 1.0 + i as Real,
                std_dev: 1.0,
            })
            .collect();
        let problem = RangeProblem::new(rows).unwrap();
        // Any point on the source line makes the Jacobian columns dependent.
        let x = DVector::from_vec(vec![-1.0, 0.0]);
        assert!(problem.covariance_at(&x).is_none());
    }
}
