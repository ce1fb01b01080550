use crate::math::Real;
use anyhow::{ensure, Result};
use nalgebra::{Point, SMatrix};
use serde::{Deserialize, Serialize};

/// A radio transmitter of known identity and carrier frequency.
///
/// Capabilities beyond identity are optional: a source may or may not expose
/// its equivalent transmitted power and path-loss exponent. RSSI readings can
/// only be converted into distances against sources that expose both.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioSource {
    id: String,
    frequency: Real,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transmit_power_dbm: Option<Real>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path_loss_exponent: Option<Real>,
}

impl RadioSource {
    /// Construct a source with identity and carrier frequency only.
    ///
    /// # Errors
    ///
    /// Returns an error if `frequency` is not finite and positive.
    pub fn new(id: impl Into<String>, frequency: Real) -> Result<Self> {
        ensure!(
            frequency.is_finite() && frequency > 0.0,
            "carrier frequency must be finite and positive, got {frequency}"
        );
        Ok(Self {
            id: id.into(),
            frequency,
            transmit_power_dbm: None,
            path_loss_exponent: None,
        })
    }

    /// Construct a source that also exposes its transmission model, making it
    /// usable for RSSI-derived ranging.
    ///
    /// # Errors
    ///
    /// Returns an error if the frequency is invalid, the transmit power is not
    /// finite, or the path-loss exponent is not finite and positive.
    pub fn with_transmission_model(
        id: impl Into<String>,
        frequency: Real,
        transmit_power_dbm: Real,
        path_loss_exponent: Real,
    ) -> Result<Self> {
        let mut source = Self::new(id, frequency)?;
        ensure!(
            transmit_power_dbm.is_finite(),
            "transmit power must be finite, got {transmit_power_dbm}"
        );
        ensure!(
            path_loss_exponent.is_finite() && path_loss_exponent > 0.0,
            "path-loss exponent must be finite and positive, got {path_loss_exponent}"
        );
        source.transmit_power_dbm = Some(transmit_power_dbm);
        source.path_loss_exponent = Some(path_loss_exponent);
        Ok(source)
    }

    /// Opaque source identity.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Carrier frequency in Hz.
    #[inline]
    pub fn frequency(&self) -> Real {
        self.frequency
    }

    /// Equivalent transmitted power in dBm, if known.
    #[inline]
    pub fn transmit_power_dbm(&self) -> Option<Real> {
        self.transmit_power_dbm
    }

    /// Path-loss exponent, if known.
    #[inline]
    pub fn path_loss_exponent(&self) -> Option<Real> {
        self.path_loss_exponent
    }

    /// Whether RSSI readings against this source can be converted to
    /// distances (transmit power and path-loss exponent both known).
    #[inline]
    pub fn supports_rssi_ranging(&self) -> bool {
        self.transmit_power_dbm.is_some() && self.path_loss_exponent.is_some()
    }
}

/// A [`RadioSource`] at a known `D`-dimensional position, optionally with a
/// position covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedRadioSource<const D: usize> {
    source: RadioSource,
    position: Point<Real, D>,
    position_covariance: Option<SMatrix<Real, D, D>>,
}

/// 2D located source.
pub type LocatedRadioSource2d = LocatedRadioSource<2>;
/// 3D located source.
pub type LocatedRadioSource3d = LocatedRadioSource<3>;

impl<const D: usize> LocatedRadioSource<D> {
    /// Place a source at a known position with no position uncertainty
    /// attached.
    pub fn new(source: RadioSource, position: Point<Real, D>) -> Self {
        Self {
            source,
            position,
            position_covariance: None,
        }
    }

    /// Place a source at a known position with a position covariance.
    ///
    /// # Errors
    ///
    /// Returns an error if the covariance is not symmetric (within a small
    /// tolerance) or has a negative diagonal entry.
    pub fn with_position_covariance(
        source: RadioSource,
        position: Point<Real, D>,
        covariance: SMatrix<Real, D, D>,
    ) -> Result<Self> {
        for r in 0..D {
            ensure!(
                covariance[(r, r)] >= 0.0,
                "position covariance has negative variance at ({r}, {r})"
            );
            for c in (r + 1)..D {
                ensure!(
                    (covariance[(r, c)] - covariance[(c, r)]).abs() <= 1e-9,
                    "position covariance must be symmetric (mismatch at ({r}, {c}))"
                );
            }
        }
        Ok(Self {
            source,
            position,
            position_covariance: Some(covariance),
        })
    }

    /// The underlying radio source.
    #[inline]
    pub fn source(&self) -> &RadioSource {
        &self.source
    }

    /// Opaque source identity (shorthand for `source().id()`).
    #[inline]
    pub fn id(&self) -> &str {
        self.source.id()
    }

    /// Known position of the source.
    #[inline]
    pub fn position(&self) -> &Point<Real, D> {
        &self.position
    }

    /// Position covariance, if one was attached.
    #[inline]
    pub fn position_covariance(&self) -> Option<&SMatrix<Real, D, D>> {
        self.position_covariance.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Pt2;
    use nalgebra::Matrix2;

    #[test]
    fn source_rejects_invalid_frequency() {
        assert!(RadioSource::new("a", 0.0).is_err());
        assert!(RadioSource::new("a", -2.4e9).is_err());
        assert!(RadioSource::new("a", Real::NAN).is_err());
        assert!(RadioSource::new("a", 2.4e9).is_ok());
    }

    #[test]
    fn transmission_model_gates_rssi_ranging() {
        let plain = RadioSource::new("a", 2.4e9).unwrap();
        assert!(!plain.supports_rssi_ranging());

        let full = RadioSource::with_transmission_model("b", 2.4e9, -30.0, 2.0).unwrap();
        assert!(full.supports_rssi_ranging());
        assert_eq!(full.transmit_power_dbm(), Some(-30.0));
        assert_eq!(full.path_loss_exponent(), Some(2.0));
    }

    #[test]
    fn transmission_model_rejects_bad_exponent() {
        assert!(RadioSource::with_transmission_model("a", 2.4e9, -30.0, 0.0).is_err());
        assert!(RadioSource::with_transmission_model("a", 2.4e9, -30.0, -2.0).is_err());
    }

    #[test]
    fn located_source_rejects_asymmetric_covariance() {
        let source = RadioSource::new("a", 2.4e9).unwrap();
        let bad = Matrix2::new(1.0, 0.5, -0.5, 1.0);
        assert!(LocatedRadioSource::with_position_covariance(
            source.clone(),
            Pt2::new(0.0, 0.0),
            bad
        )
        .is_err());

        let good = Matrix2::new(1.0, 0.2, 0.2, 2.0);
        let located =
            LocatedRadioSource::with_position_covariance(source, Pt2::new(0.0, 0.0), good)
                .unwrap();
        assert!(located.position_covariance().is_some());
    }

    #[test]
    fn source_serde_roundtrip() {
        let source = RadioSource::with_transmission_model("beacon-7", 2.4e9, -30.0, 2.0).unwrap();
        let json = serde_json::to_string(&source).unwrap();
        let restored: RadioSource = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, source);
    }
}
