//! Limit guard: azimuth/elevation bounds for SET commands.
//!
//! Every SET target passes through [`LimitGuard::apply`] before a single
//! byte is written. Under the default [`LimitPolicy::Reject`] an out-of-range
//! target is refused with [`Error::OutOfRange`]. [`LimitPolicy::Correct`]
//! is an explicit opt-in that wraps azimuth by whole turns and clamps
//! elevation instead, logging each correction.

use std::sync::{PoisonError, RwLock};

use tracing::warn;

use rot2prog_core::{Axis, Error, LimitPolicy, Limits, Position, Result};

/// Synchronized holder of the current [`Limits`].
///
/// Limits are replaced as a whole, so a reader sees either the old or the
/// new bounds, never a mix.
#[derive(Debug)]
pub struct LimitGuard {
    limits: RwLock<Limits>,
    policy: LimitPolicy,
}

impl LimitGuard {
    /// Create a guard with the given bounds and policy.
    pub fn new(limits: Limits, policy: LimitPolicy) -> Self {
        LimitGuard {
            limits: RwLock::new(limits),
            policy,
        }
    }

    /// The bounds currently in force.
    pub fn get_limits(&self) -> Limits {
        *self.limits.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the bounds.
    pub fn set_limits(&self, limits: Limits) {
        *self.limits.write().unwrap_or_else(PoisonError::into_inner) = limits;
    }

    /// The out-of-range policy fixed at construction.
    pub fn policy(&self) -> LimitPolicy {
        self.policy
    }

    /// Check a target against the current bounds without correcting it.
    pub fn validate(&self, azimuth: f64, elevation: f64) -> Result<()> {
        let limits = self.get_limits();
        check_finite(azimuth, elevation)?;
        check_axis(Axis::Azimuth, azimuth, &limits)?;
        check_axis(Axis::Elevation, elevation, &limits)
    }

    /// Produce the position to send for a SET target, per the policy.
    pub fn apply(&self, azimuth: f64, elevation: f64) -> Result<Position> {
        match self.policy {
            LimitPolicy::Reject => {
                self.validate(azimuth, elevation)?;
                Ok(Position::new(azimuth, elevation))
            }
            LimitPolicy::Correct => {
                check_finite(azimuth, elevation)?;
                let limits = self.get_limits();
                Ok(Position::new(
                    correct_azimuth(azimuth, &limits),
                    correct_elevation(elevation, &limits),
                ))
            }
        }
    }
}

impl Default for LimitGuard {
    fn default() -> Self {
        LimitGuard::new(Limits::default(), LimitPolicy::default())
    }
}

fn check_finite(azimuth: f64, elevation: f64) -> Result<()> {
    if azimuth.is_finite() && elevation.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "non-finite target az={azimuth} el={elevation}"
        )))
    }
}

fn check_axis(axis: Axis, value: f64, limits: &Limits) -> Result<()> {
    let (min, max) = limits.bounds(axis);
    if value < min || value > max {
        return Err(Error::OutOfRange {
            axis,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Bring azimuth into range by whole turns, clamping whatever is left.
fn correct_azimuth(azimuth: f64, limits: &Limits) -> f64 {
    let (min, max) = limits.bounds(Axis::Azimuth);
    let mut corrected = azimuth;
    if corrected > max {
        corrected -= ((corrected - max) / 360.0).ceil() * 360.0;
    }
    if corrected < min {
        corrected += ((min - corrected) / 360.0).ceil() * 360.0;
    }
    // A window narrower than one turn can leave the value outside.
    corrected = corrected.min(max).max(min);
    if corrected != azimuth {
        warn!(requested = azimuth, corrected, "azimuth out of range, corrected");
    }
    corrected
}

fn correct_elevation(elevation: f64, limits: &Limits) -> f64 {
    let (min, max) = limits.bounds(Axis::Elevation);
    let corrected = elevation.min(max).max(min);
    if corrected != elevation {
        warn!(requested = elevation, corrected, "elevation out of range, corrected");
    }
    corrected
}
