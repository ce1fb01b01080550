use crate::math::Real;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// A single measurement against one radio source.
///
/// The three variants mirror what real ranging hardware reports: a direct
/// range (e.g. time-of-flight), a received signal strength, or both. Quality
/// metrics are optional; rows without them fall back to a configurable
/// default standard deviation at derivation time.
///
/// Immutable value object; use the constructors to get validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reading {
    /// Direct range measurement.
    Ranging {
        /// Identity of the source this reading was taken against.
        source_id: String,
        /// Measured distance, same linear unit as source positions.
        distance: Real,
        /// Standard deviation of the measured distance, if the hardware
        /// reports one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distance_std_dev: Option<Real>,
    },
    /// Received-signal-strength measurement.
    Rssi {
        /// Identity of the source this reading was taken against.
        source_id: String,
        /// Measured received power in dBm.
        rssi_dbm: Real,
        /// Standard deviation of the RSSI in dB, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rssi_std_dev: Option<Real>,
    },
    /// Combined range and signal-strength measurement.
    RangingAndRssi {
        /// Identity of the source this reading was taken against.
        source_id: String,
        /// Measured distance, same linear unit as source positions.
        distance: Real,
        /// Standard deviation of the measured distance, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distance_std_dev: Option<Real>,
        /// Measured received power in dBm.
        rssi_dbm: Real,
        /// Standard deviation of the RSSI in dB, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rssi_std_dev: Option<Real>,
    },
}

fn check_distance(distance: Real, std_dev: Option<Real>) -> Result<()> {
    ensure!(
        distance.is_finite() && distance >= 0.0,
        "measured distance must be finite and non-negative, got {distance}"
    );
    if let Some(sd) = std_dev {
        ensure!(
            sd.is_finite() && sd > 0.0,
            "distance standard deviation must be finite and positive, got {sd}"
        );
    }
    Ok(())
}

fn check_rssi(rssi_dbm: Real, std_dev: Option<Real>) -> Result<()> {
    ensure!(rssi_dbm.is_finite(), "RSSI must be finite, got {rssi_dbm}");
    if let Some(sd) = std_dev {
        ensure!(
            sd.is_finite() && sd > 0.0,
            "RSSI standard deviation must be finite and positive, got {sd}"
        );
    }
    Ok(())
}

impl Reading {
    /// Construct a ranging-only reading.
    pub fn ranging(
        source_id: impl Into<String>,
        distance: Real,
        distance_std_dev: Option<Real>,
    ) -> Result<Self> {
        check_distance(distance, distance_std_dev)?;
        Ok(Self::Ranging {
            source_id: source_id.into(),
            distance,
            distance_std_dev,
        })
    }

    /// Construct an RSSI-only reading.
    pub fn rssi(
        source_id: impl Into<String>,
        rssi_dbm: Real,
        rssi_std_dev: Option<Real>,
    ) -> Result<Self> {
        check_rssi(rssi_dbm, rssi_std_dev)?;
        Ok(Self::Rssi {
            source_id: source_id.into(),
            rssi_dbm,
            rssi_std_dev,
        })
    }

    /// Construct a combined ranging + RSSI reading.
    pub fn ranging_and_rssi(
        source_id: impl Into<String>,
        distance: Real,
        distance_std_dev: Option<Real>,
        rssi_dbm: Real,
        rssi_std_dev: Option<Real>,
    ) -> Result<Self> {
        check_distance(distance, distance_std_dev)?;
        check_rssi(rssi_dbm, rssi_std_dev)?;
        Ok(Self::RangingAndRssi {
            source_id: source_id.into(),
            distance,
            distance_std_dev,
            rssi_dbm,
            rssi_std_dev,
        })
    }

    /// Identity of the source this reading was taken against.
    pub fn source_id(&self) -> &str {
        match self {
            Self::Ranging { source_id, .. }
            | Self::Rssi { source_id, .. }
            | Self::RangingAndRssi { source_id, .. } => source_id,
        }
    }

    /// Direct distance measurement, if this reading carries one.
    pub fn distance(&self) -> Option<Real> {
        match self {
            Self::Ranging { distance, .. } | Self::RangingAndRssi { distance, .. } => {
                Some(*distance)
            }
            Self::Rssi { .. } => None,
        }
    }

    /// Standard deviation of the direct distance measurement, if present.
    pub fn distance_std_dev(&self) -> Option<Real> {
        match self {
            Self::Ranging {
                distance_std_dev, ..
            }
            | Self::RangingAndRssi {
                distance_std_dev, ..
            } => *distance_std_dev,
            Self::Rssi { .. } => None,
        }
    }

    /// RSSI measurement in dBm, if this reading carries one.
    pub fn rssi_dbm(&self) -> Option<Real> {
        match self {
            Self::Rssi { rssi_dbm, .. } | Self::RangingAndRssi { rssi_dbm, .. } => Some(*rssi_dbm),
            Self::Ranging { .. } => None,
        }
    }

    /// Standard deviation of the RSSI measurement in dB, if present.
    pub fn rssi_std_dev(&self) -> Option<Real> {
        match self {
            Self::Rssi { rssi_std_dev, .. } | Self::RangingAndRssi { rssi_std_dev, .. } => {
                *rssi_std_dev
            }
            Self::Ranging { .. } => None,
        }
    }
}

/// The readings collected at one unknown position against multiple sources.
///
/// Iteration order is the insertion order, so the pairing between readings
/// and derived estimation rows is reproducible across calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    readings: Vec<Reading>,
}

impl Fingerprint {
    /// Empty fingerprint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint from a list of readings, preserving order.
    pub fn from_readings(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    /// Append a reading.
    pub fn push(&mut self, reading: Reading) {
        self.readings.push(reading);
    }

    /// Number of readings.
    #[inline]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Returns true if there are no readings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Iterate over readings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    /// Readings as a slice, in insertion order.
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }
}

impl<'a> IntoIterator for &'a Fingerprint {
    type Item = &'a Reading;
    type IntoIter = std::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranging_reading_validation() {
        assert!(Reading::ranging("a", 10.0, None).is_ok());
        assert!(Reading::ranging("a", 10.0, Some(0.5)).is_ok());
        assert!(Reading::ranging("a", -1.0, None).is_err());
        assert!(Reading::ranging("a", Real::INFINITY, None).is_err());
        assert!(Reading::ranging("a", 10.0, Some(0.0)).is_err());
    }

    #[test]
    fn rssi_reading_validation() {
        assert!(Reading::rssi("a", -62.0, None).is_ok());
        assert!(Reading::rssi("a", Real::NAN, None).is_err());
        assert!(Reading::rssi("a", -62.0, Some(-1.0)).is_err());
    }

    #[test]
    fn accessors_match_variant() {
        let r = Reading::ranging_and_rssi("a", 12.0, Some(0.3), -70.0, Some(1.5)).unwrap();
        assert_eq!(r.source_id(), "a");
        assert_eq!(r.distance(), Some(12.0));
        assert_eq!(r.distance_std_dev(), Some(0.3));
        assert_eq!(r.rssi_dbm(), Some(-70.0));
        assert_eq!(r.rssi_std_dev(), Some(1.5));

        let rssi_only = Reading::rssi("b", -50.0, None).unwrap();
        assert_eq!(rssi_only.distance(), None);
        assert_eq!(rssi_only.rssi_dbm(), Some(-50.0));
    }

    #[test]
    fn fingerprint_preserves_order() {
        let mut fp = Fingerprint::new();
        fp.push(Reading::ranging("b", 2.0, None).unwrap());
        fp.push(Reading::ranging("a", 1.0, None).unwrap());

        let ids: Vec<&str> = fp.iter().map(|r| r.source_id()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn reading_serde_roundtrip() {
        let r = Reading::rssi("beacon-1", -55.5, Some(2.0)).unwrap();
        let json = serde_json::to_string(&r).unwrap();
        let restored: Reading = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, r);
    }
}
