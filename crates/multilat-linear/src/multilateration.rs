use multilat_core::Real;
use nalgebra::{DMatrix, DVector, Point, SVector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinearError {
    #[error("need at least {needed} rows for a linear solve, got {got}")]
    NotEnoughRows { needed: usize, got: usize },
    #[error("degenerate source geometry, linear system is rank-deficient")]
    DegenerateGeometry,
}

/// Closed-form linear multilateration.
///
/// Subtracting the first range equation from each of the others cancels the
/// quadratic term in the unknown position `p`:
///
/// `2(s_i − s_0)ᵀ p = (‖s_i‖² − ‖s_0‖²) − (d_i² − d_0²)`
///
/// leaving an overdetermined linear system solved by SVD. Needs at least
/// `D + 1` rows; collinear (2D) or coplanar (3D) sources make the system
/// rank-deficient and are reported as [`LinearError::DegenerateGeometry`].
pub fn linear_multilateration<const D: usize>(
    positions: &[Point<Real, D>],
    distances: &[Real],
) -> Result<Point<Real, D>, LinearError> {
    let n = positions.len();
    if n < D + 1 || distances.len() != n {
        return Err(LinearError::NotEnoughRows {
            needed: D + 1,
            got: n.min(distances.len()),
        });
    }

    let s0 = &positions[0];
    let d0 = distances[0];
    let s0_sq = s0.coords.norm_squared();

    let mut a = DMatrix::<Real>::zeros(n - 1, D);
    let mut b = DVector::<Real>::zeros(n - 1);

    for i in 1..n {
        let si = &positions[i];
        let di = distances[i];
        for c in 0..D {
            a[(i - 1, c)] = 2.0 * (si.coords[c] - s0.coords[c]);
        }
        b[i - 1] = (si.coords.norm_squared() - s0_sq) - (di * di - d0 * d0);
    }

    let svd = a.svd(true, true);
    if svd.rank(1e-9) < D {
        return Err(LinearError::DegenerateGeometry);
    }
    let x = svd
        .solve(&b, 1e-12)
        .map_err(|_| LinearError::DegenerateGeometry)?;

    Ok(Point::from(SVector::<Real, D>::from_iterator(
        x.iter().copied(),
    )))
}

/// Centroid of the source positions.
///
/// The seed of last resort when the linear solve is unusable; always inside
/// the convex hull of the sources, which is good enough to start the damped
/// iteration.
pub fn centroid<const D: usize>(positions: &[Point<Real, D>]) -> Result<Point<Real, D>, LinearError> {
    if positions.is_empty() {
        return Err(LinearError::NotEnoughRows { needed: 1, got: 0 });
    }
    let mut sum = SVector::<Real, D>::zeros();
    for p in positions {
        sum += p.coords;
    }
    Ok(Point::from(sum / positions.len() as Real))
}
