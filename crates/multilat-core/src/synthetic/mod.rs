//! Synthetic positioning scenarios.
//!
//! The functions here build deterministic source layouts around a point and
//! produce exact (noise-free) fingerprints from a ground-truth position, so
//! tests and examples can assert convergence against a known answer. Noise,
//! when wanted, is added on top with [`noisy_ranging_fingerprint`].

use crate::math::{Pt2, Pt3, Real};
use crate::models::{Fingerprint, LocatedRadioSource, RadioSource, Reading};
use anyhow::{ensure, Result};
use nalgebra::Point;
use std::f64::consts::TAU;

/// `n` points evenly spaced on a circle around `center`.
///
/// Output order is deterministic (counter-clockwise from +X).
pub fn ring_positions(n: usize, center: Pt2, radius: Real) -> Vec<Pt2> {
    (0..n)
        .map(|i| {
            let angle = TAU * i as Real / n as Real;
            Pt2::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

/// The six axis-aligned points at `radius` from `center` (octahedron
/// vertices). A convenient well-conditioned 3D layout.
pub fn octahedron_positions(center: Pt3, radius: Real) -> Vec<Pt3> {
    let c = center;
    vec![
        Pt3::new(c.x + radius, c.y, c.z),
        Pt3::new(c.x - radius, c.y, c.z),
        Pt3::new(c.x, c.y + radius, c.z),
        Pt3::new(c.x, c.y - radius, c.z),
        Pt3::new(c.x, c.y, c.z + radius),
        Pt3::new(c.x, c.y, c.z - radius),
    ]
}

/// Located sources with ids `src-0`, `src-1`, ... at the given positions.
///
/// Sources carry identity and frequency only; use [`rssi_sources`] when the
/// scenario needs RSSI-derived ranging.
pub fn located_sources<const D: usize>(
    positions: &[Point<Real, D>],
    frequency: Real,
) -> Result<Vec<LocatedRadioSource<D>>> {
    positions
        .iter()
        .enumerate()
        .map(|(i, p)| Ok(LocatedRadioSource::new(RadioSource::new(format!("src-{i}"), frequency)?, *p)))
        .collect()
}

/// Located sources that also expose a transmission model, so RSSI readings
/// against them can be inverted into distances.
pub fn rssi_sources<const D: usize>(
    positions: &[Point<Real, D>],
    frequency: Real,
    transmit_power_dbm: Real,
    path_loss_exponent: Real,
) -> Result<Vec<LocatedRadioSource<D>>> {
    positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let source = RadioSource::with_transmission_model(
                format!("src-{i}"),
                frequency,
                transmit_power_dbm,
                path_loss_exponent,
            )?;
            Ok(LocatedRadioSource::new(source, *p))
        })
        .collect()
}

/// Exact ranging fingerprint: one `Ranging` reading per source with the true
/// Euclidean distance to `truth`.
pub fn exact_ranging_fingerprint<const D: usize>(
    sources: &[LocatedRadioSource<D>],
    truth: &Point<Real, D>,
) -> Result<Fingerprint> {
    let mut fp = Fingerprint::new();
    for s in sources {
        let d = (truth - s.position()).norm();
        fp.push(Reading::ranging(s.id(), d, None)?);
    }
    Ok(fp)
}

/// Exact RSSI fingerprint: one `Rssi` reading per source with the RSSI the
/// free-space model predicts at the true distance.
///
/// # Errors
///
/// Fails if any source does not expose a transmission model.
pub fn exact_rssi_fingerprint<const D: usize>(
    sources: &[LocatedRadioSource<D>],
    truth: &Point<Real, D>,
) -> Result<Fingerprint> {
    let mut fp = Fingerprint::new();
    for s in sources {
        ensure!(
            s.source().supports_rssi_ranging(),
            "source {} has no transmission model",
            s.id()
        );
        let d = (truth - s.position()).norm();
        let rssi = crate::propagation::rssi_from_distance(
            d,
            s.source().transmit_power_dbm().unwrap(),
            s.source().frequency(),
            s.source().path_loss_exponent().unwrap(),
        );
        fp.push(Reading::rssi(s.id(), rssi, None)?);
    }
    Ok(fp)
}

/// Ranging fingerprint with zero-mean Gaussian noise of `sigma` added to
/// every distance (clamped at zero), tagged with `sigma` as the reading's
/// quality metric.
pub fn noisy_ranging_fingerprint<const D: usize, R: rand::Rng>(
    sources: &[LocatedRadioSource<D>],
    truth: &Point<Real, D>,
    sigma: Real,
    rng: &mut R,
) -> Result<Fingerprint> {
    use rand_distr::{Distribution, Normal};

    let normal = Normal::new(0.0, sigma)?;
    let mut fp = Fingerprint::new();
    for s in sources {
        let d = (truth - s.position()).norm() + normal.sample(rng);
        fp.push(Reading::ranging(s.id(), d.max(0.0), Some(sigma))?);
    }
    Ok(fp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_positions_lie_on_circle() {
        let center = Pt2::new(3.0, -1.0);
        let pts = ring_positions(5, center, 10.0);
        assert_eq!(pts.len(), 5);
        for p in &pts {
            assert!(((p - center).norm() - 10.0).abs() < 1e-12);
        }
    }

    #[test]
    fn octahedron_has_six_equidistant_points() {
        let center = Pt3::new(1.0, 2.0, 3.0);
        let pts = octahedron_positions(center, 4.0);
        assert_eq!(pts.len(), 6);
        for p in &pts {
            assert!(((p - center).norm() - 4.0).abs() < 1e-12);
        }
    }

    #[test]
    fn exact_fingerprints_agree_with_geometry() {
        let truth = Pt2::new(1.0, 1.0);
        let sources =
            rssi_sources(&ring_positions(4, Pt2::origin(), 10.0), 2.4e9, -30.0, 2.0).unwrap();

        let ranging = exact_ranging_fingerprint(&sources, &truth).unwrap();
        let rssi = exact_rssi_fingerprint(&sources, &truth).unwrap();
        assert_eq!(ranging.len(), 4);
        assert_eq!(rssi.len(), 4);

        // Inverting the synthetic RSSI must give back the true distance.
        for (r, s) in rssi.iter().zip(&sources) {
            let d_true = (truth - s.position()).norm();
            let d = crate::propagation::distance_from_rssi(
                r.rssi_dbm().unwrap(),
                -30.0,
                2.4e9,
                2.0,
            );
            assert!((d - d_true).abs() < 1e-9);
        }
    }

    #[test]
    fn noisy_fingerprint_tags_sigma_and_stays_near_geometry() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let truth = Pt2::new(2.0, -3.0);
        let sigma = 0.1;
        let sources = located_sources(&ring_positions(6, Pt2::origin(), 20.0), 2.4e9).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let fp = noisy_ranging_fingerprint(&sources, &truth, sigma, &mut rng).unwrap();

        assert_eq!(fp.len(), 6);
        for (r, s) in fp.iter().zip(&sources) {
            assert_eq!(r.distance_std_dev(), Some(sigma));
            let d_true = (truth - s.position()).norm();
            assert!((r.distance().unwrap() - d_true).abs() < 6.0 * sigma);
        }
    }

    #[test]
    fn exact_rssi_fingerprint_requires_transmission_model() {
        let truth = Pt2::origin();
        let sources = located_sources(&ring_positions(3, truth, 5.0), 2.4e9).unwrap();
        assert!(exact_rssi_fingerprint(&sources, &truth).is_err());
    }
}
