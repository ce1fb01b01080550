//! Distance derivation.
//!
//! Turns matched (located source, reading) pairs into the weighted
//! `(position, distance, σ)` rows the nonlinear solver consumes. Direct
//! range measurements are used as-is; RSSI readings go through the
//! free-space path-loss inversion. Rows that cannot be derived (unmatched
//! source id, RSSI against a source with no transmission model, non-positive
//! distance) are dropped, not errors — readiness is judged on what remains.

use multilat_core::propagation::{distance_from_rssi, distance_std_dev_from_rssi_std_dev};
use multilat_core::{Fingerprint, LocatedRadioSource, Reading, Real};
use nalgebra::Point;

/// One solver-ready observation row, kept around after `estimate()` for
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow<const D: usize> {
    /// Identity of the source the row was derived against.
    pub source_id: String,
    /// Known position of that source.
    pub source_position: Point<Real, D>,
    /// Derived distance.
    pub distance: Real,
    /// Effective distance standard deviation used to weight the row.
    pub distance_std_dev: Real,
}

/// Derive solver rows from a fingerprint against a source catalog.
///
/// Row order follows fingerprint insertion order, so the pairing between
/// readings and rows is reproducible. `fallback_distance_std_dev` is used
/// whenever a reading carries no quality metric of its own.
///
/// With `use_source_position_covariance`, a source's position covariance is
/// folded into the row weight as `σ_eff = sqrt(σ_d² + trace(Σ))`: an
/// uncertain source location degrades any range measured against it. The
/// trace bounds the variance along the (unknown) line of sight.
pub fn derive_rows<const D: usize>(
    sources: &[LocatedRadioSource<D>],
    fingerprint: &Fingerprint,
    fallback_distance_std_dev: Real,
    use_source_position_covariance: bool,
) -> Vec<DerivedRow<D>> {
    let mut rows = Vec::with_capacity(fingerprint.len());

    for reading in fingerprint {
        let Some(source) = sources.iter().find(|s| s.id() == reading.source_id()) else {
            continue;
        };

        let Some((distance, std_dev)) = derive_distance(source, reading, fallback_distance_std_dev)
        else {
            continue;
        };

        if !(distance.is_finite() && distance > 0.0) {
            continue;
        }

        let mut effective_std_dev = std_dev;
        if use_source_position_covariance {
            if let Some(cov) = source.position_covariance() {
                effective_std_dev = (std_dev * std_dev + cov.trace()).sqrt();
            }
        }

        rows.push(DerivedRow {
            source_id: source.id().to_string(),
            source_position: *source.position(),
            distance,
            distance_std_dev: effective_std_dev,
        });
    }

    rows
}

/// Distance and standard deviation for one matched pair, or `None` when the
/// pair is infeasible.
fn derive_distance<const D: usize>(
    source: &LocatedRadioSource<D>,
    reading: &Reading,
    fallback_std_dev: Real,
) -> Option<(Real, Real)> {
    // A direct range wins over RSSI when both are present.
    if let Some(distance) = reading.distance() {
        let std_dev = reading.distance_std_dev().unwrap_or(fallback_std_dev);
        return Some((distance, std_dev));
    }

    let rssi_dbm = reading.rssi_dbm()?;
    let radio = source.source();
    let (tx_power, exponent) = radio
        .transmit_power_dbm()
        .zip(radio.path_loss_exponent())?;

    let distance = distance_from_rssi(rssi_dbm, tx_power, radio.frequency(), exponent);
    let std_dev = match reading.rssi_std_dev() {
        Some(rssi_sd) => distance_std_dev_from_rssi_std_dev(distance, exponent, rssi_sd),
        None => fallback_std_dev,
    };
    Some((distance, std_dev))
}
