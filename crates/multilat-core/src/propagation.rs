//! Free-space path-loss propagation model.
//!
//! The received power of a source at distance `d` follows
//!
//! `Pr = Pte · (c / (4π·f))^n / d^n`
//!
//! where `Pte` is the equivalent transmitted power, `f` the carrier
//! frequency, `n` the path-loss exponent (2.0 in free space) and `c` the
//! speed of light. Working in dBm the power ratio turns into a difference,
//! which gives a closed form for both directions and for the first-order
//! uncertainty propagation.
//!
//! All functions assume their arguments have already been validated
//! ([`crate::RadioSource`] enforces positive frequency and exponent).

use crate::math::{Real, SPEED_OF_LIGHT};
use std::f64::consts::PI;

/// Wavelength-derived scale `c / (4π·f)`: the distance at which the
/// free-space model predicts zero path loss.
#[inline]
pub fn reference_distance(frequency: Real) -> Real {
    SPEED_OF_LIGHT / (4.0 * PI * frequency)
}

/// Expected RSSI in dBm at `distance` from a source.
///
/// Inverse of [`distance_from_rssi`]; used by synthetic scenarios and for
/// cross-checking derived distances.
pub fn rssi_from_distance(
    distance: Real,
    transmit_power_dbm: Real,
    frequency: Real,
    path_loss_exponent: Real,
) -> Real {
    let k = reference_distance(frequency);
    transmit_power_dbm + 10.0 * path_loss_exponent * (k / distance).log10()
}

/// Distance implied by an observed RSSI under the free-space model.
///
/// Solving the path-loss equation for `d` gives
/// `d = (c / (4π·f)) · 10^((Pte − Pr) / (10·n))` with both powers in dBm.
pub fn distance_from_rssi(
    rssi_dbm: Real,
    transmit_power_dbm: Real,
    frequency: Real,
    path_loss_exponent: Real,
) -> Real {
    let k = reference_distance(frequency);
    k * Real::powf(
        10.0,
        (transmit_power_dbm - rssi_dbm) / (10.0 * path_loss_exponent),
    )
}

/// First-order propagation of an RSSI standard deviation (dB) into a
/// distance standard deviation.
///
/// From `d(Pr) = k · 10^((Pte − Pr)/(10n))`,
/// `∂d/∂Pr = −d · ln(10) / (10·n)`, so `σ_d = d · ln(10) / (10·n) · σ_Pr`.
pub fn distance_std_dev_from_rssi_std_dev(
    distance: Real,
    path_loss_exponent: Real,
    rssi_std_dev: Real,
) -> Real {
    distance * std::f64::consts::LN_10 / (10.0 * path_loss_exponent) * rssi_std_dev
}
