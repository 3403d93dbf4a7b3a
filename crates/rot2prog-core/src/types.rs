//! Core types used throughout the ROT2Prog workspace.
//!
//! These describe rotator state (positions, resolution, limits) and the
//! per-deployment protocol choices that must be fixed once for both the
//! client and the controller it talks to.

use std::fmt;

use crate::error::{Error, Result};

/// One of the two rotation axes of an az/el rotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal rotation.
    Azimuth,
    /// Vertical rotation.
    Elevation,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Azimuth => write!(f, "azimuth"),
            Axis::Elevation => write!(f, "elevation"),
        }
    }
}

/// Round a value in degrees to one decimal place.
///
/// The controller reports angles in tenths of a degree, so every decoded
/// or simulated angle passes through this.
pub fn round_to_tenth(degrees: f64) -> f64 {
    (degrees * 10.0).round() / 10.0
}

/// An antenna position in degrees.
///
/// No range is enforced here; bounds are the job of the limit guard.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// Azimuth in degrees.
    pub azimuth: f64,
    /// Elevation in degrees.
    pub elevation: f64,
}

impl Position {
    /// Create a position from azimuth and elevation in degrees.
    pub fn new(azimuth: f64, elevation: f64) -> Self {
        Position { azimuth, elevation }
    }

    /// Return this position with both axes rounded to one decimal place.
    pub fn rounded(self) -> Self {
        Position {
            azimuth: round_to_tenth(self.azimuth),
            elevation: round_to_tenth(self.elevation),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "az {:.1}°, el {:.1}°", self.azimuth, self.elevation)
    }
}

/// Controller resolution in pulses per degree.
///
/// Values are only produced by [`ResolutionSet`] validation or the
/// associated constants, so a `Resolution` is always one a controller can
/// report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution(u8);

impl Resolution {
    /// One pulse per degree. The value assumed before the first exchange.
    pub const ONE: Resolution = Resolution(1);
    /// Two pulses per degree (0.5° steps).
    pub const TWO: Resolution = Resolution(2);
    /// Four pulses per degree (0.25° steps).
    pub const FOUR: Resolution = Resolution(4);
    /// Ten pulses per degree, reported by some controller firmware.
    pub const TEN: Resolution = Resolution(10);

    /// Look up a resolution any controller firmware can report.
    ///
    /// Whether a deployment accepts it is decided by [`ResolutionSet`].
    pub fn from_pulses(pulses: u8) -> Option<Resolution> {
        ResolutionSet::Extended
            .contains(pulses)
            .then_some(Resolution(pulses))
    }

    /// Pulses per degree as carried in the PH/PV bytes.
    pub fn pulses_per_degree(self) -> u8 {
        self.0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::ONE
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pulses/degree", self.0)
    }
}

/// The set of resolutions a deployment accepts from its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionSet {
    /// 1, 2 or 4 pulses per degree.
    #[default]
    Standard,
    /// 1, 2, 4 or 10 pulses per degree.
    Extended,
}

impl ResolutionSet {
    /// The resolution byte values in this set.
    pub fn values(self) -> &'static [u8] {
        match self {
            ResolutionSet::Standard => &[1, 2, 4],
            ResolutionSet::Extended => &[1, 2, 4, 10],
        }
    }

    /// Whether `pulses` is a member of this set.
    pub fn contains(self, pulses: u8) -> bool {
        self.values().contains(&pulses)
    }

    /// Convert a single resolution byte, rejecting values outside the set.
    pub fn resolution(self, pulses: u8) -> Result<Resolution> {
        if self.contains(pulses) {
            Ok(Resolution(pulses))
        } else {
            Err(Error::InvalidParameter(format!(
                "resolution {} not in {:?}",
                pulses,
                self.values()
            )))
        }
    }

    /// Validate the PH/PV pair of a response.
    ///
    /// Both bytes must be equal and members of this set.
    pub fn validate(self, ph: u8, pv: u8) -> Result<Resolution> {
        if ph != pv || !self.contains(ph) {
            return Err(Error::InvalidResolution { ph, pv });
        }
        Ok(Resolution(ph))
    }
}

/// Azimuth/elevation bounds in degrees.
///
/// `min <= max` is expected but not enforced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    /// Lowest azimuth accepted, in degrees.
    pub min_az: f64,
    /// Highest azimuth accepted, in degrees.
    pub max_az: f64,
    /// Lowest elevation accepted, in degrees.
    pub min_el: f64,
    /// Highest elevation accepted, in degrees.
    pub max_el: f64,
}

impl Limits {
    /// Create a set of limits.
    pub fn new(min_az: f64, max_az: f64, min_el: f64, max_el: f64) -> Self {
        Limits {
            min_az,
            max_az,
            min_el,
            max_el,
        }
    }

    /// The `(min, max)` bounds for one axis.
    pub fn bounds(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::Azimuth => (self.min_az, self.max_az),
            Axis::Elevation => (self.min_el, self.max_el),
        }
    }
}

impl Default for Limits {
    /// The full mechanical range of the Alfa rotators: -180..540 azimuth,
    /// -21..180 elevation.
    fn default() -> Self {
        Limits::new(-180.0, 540.0, -21.0, 180.0)
    }
}

/// How the decimal digits of the H/V fields are carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigitEncoding {
    /// Raw digit values 0x00..=0x09.
    #[default]
    Raw,
    /// ASCII digits `'0'..='9'` (0x30..=0x39).
    Ascii,
}

impl DigitEncoding {
    /// Encode one decimal digit (0..=9).
    pub fn encode(self, digit: u8) -> u8 {
        match self {
            DigitEncoding::Raw => digit,
            DigitEncoding::Ascii => b'0' + digit,
        }
    }

    /// Decode one wire byte to its digit value, or `None` if the byte is
    /// not a digit in this encoding.
    pub fn decode(self, byte: u8) -> Option<u8> {
        let digit = match self {
            DigitEncoding::Raw => byte,
            DigitEncoding::Ascii => byte.checked_sub(b'0')?,
        };
        (digit <= 9).then_some(digit)
    }
}

/// What to do with a SET target outside the configured limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitPolicy {
    /// Reject the request with [`Error::OutOfRange`]; nothing is sent.
    #[default]
    Reject,
    /// Wrap azimuth by whole turns and clamp elevation, logging a warning.
    Correct,
}

/// Protocol choices fixed once per client or simulator instance.
///
/// The wire format has variants that cannot be detected from the traffic
/// itself, so both ends of a link must be configured the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtocolConfig {
    /// Digit encoding of the H/V fields.
    pub digit_encoding: DigitEncoding,
    /// Resolutions accepted in PH/PV.
    pub resolutions: ResolutionSet,
    /// Out-of-range policy for SET.
    pub limit_policy: LimitPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_tenth_rounds_half_away_from_zero() {
        assert_eq!(round_to_tenth(10.25), 10.3);
        assert_eq!(round_to_tenth(-0.04), -0.0);
        assert_eq!(round_to_tenth(45.0), 45.0);
    }

    #[test]
    fn position_display() {
        let p = Position::new(10.5, 45.0);
        assert_eq!(p.to_string(), "az 10.5°, el 45.0°");
    }

    #[test]
    fn position_rounded() {
        let p = Position::new(123.456, -7.06).rounded();
        assert_eq!(p, Position::new(123.5, -7.1));
    }

    #[test]
    fn resolution_default_is_one() {
        assert_eq!(Resolution::default(), Resolution::ONE);
        assert_eq!(Resolution::default().pulses_per_degree(), 1);
    }

    #[test]
    fn from_pulses_knows_firmware_values() {
        assert_eq!(Resolution::from_pulses(4), Some(Resolution::FOUR));
        assert_eq!(Resolution::from_pulses(10), Some(Resolution::TEN));
        assert_eq!(Resolution::from_pulses(3), None);
        assert_eq!(Resolution::from_pulses(0), None);
    }

    #[test]
    fn standard_set_rejects_ten() {
        assert!(ResolutionSet::Standard.resolution(10).is_err());
        assert_eq!(
            ResolutionSet::Extended.resolution(10).unwrap(),
            Resolution::TEN
        );
    }

    #[test]
    fn validate_requires_matching_pair() {
        let set = ResolutionSet::Standard;
        assert_eq!(set.validate(2, 2).unwrap(), Resolution::TWO);
        assert!(matches!(
            set.validate(2, 4),
            Err(Error::InvalidResolution { ph: 2, pv: 4 })
        ));
        assert!(matches!(
            set.validate(3, 3),
            Err(Error::InvalidResolution { ph: 3, pv: 3 })
        ));
        assert!(matches!(
            set.validate(0, 0),
            Err(Error::InvalidResolution { .. })
        ));
    }

    #[test]
    fn limits_default() {
        let limits = Limits::default();
        assert_eq!(limits.bounds(Axis::Azimuth), (-180.0, 540.0));
        assert_eq!(limits.bounds(Axis::Elevation), (-21.0, 180.0));
    }

    #[test]
    fn digit_encoding_raw() {
        assert_eq!(DigitEncoding::Raw.encode(7), 0x07);
        assert_eq!(DigitEncoding::Raw.decode(0x07), Some(7));
        assert_eq!(DigitEncoding::Raw.decode(0x0A), None);
        assert_eq!(DigitEncoding::Raw.decode(b'7'), None);
    }

    #[test]
    fn digit_encoding_ascii() {
        assert_eq!(DigitEncoding::Ascii.encode(7), b'7');
        assert_eq!(DigitEncoding::Ascii.decode(b'0'), Some(0));
        assert_eq!(DigitEncoding::Ascii.decode(b'9'), Some(9));
        assert_eq!(DigitEncoding::Ascii.decode(0x07), None);
        assert_eq!(DigitEncoding::Ascii.decode(b':'), None);
    }

    #[test]
    fn protocol_config_defaults() {
        let config = ProtocolConfig::default();
        assert_eq!(config.digit_encoding, DigitEncoding::Raw);
        assert_eq!(config.resolutions, ResolutionSet::Standard);
        assert_eq!(config.limit_policy, LimitPolicy::Reject);
    }
}
