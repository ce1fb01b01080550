//! Radio source and reading model.
//!
//! A [`RadioSource`] identifies a transmitter and carries whatever is known
//! about its emission (carrier frequency, equivalent transmitted power,
//! path-loss exponent). A [`LocatedRadioSource`] additionally pins the source
//! to a known position, optionally with a position covariance. A [`Reading`]
//! is one observation against a source; a [`Fingerprint`] is the set of
//! readings collected at one unknown position.

mod reading;
mod source;

pub use reading::{Fingerprint, Reading};
pub use source::{LocatedRadioSource, LocatedRadioSource2d, LocatedRadioSource3d, RadioSource};
