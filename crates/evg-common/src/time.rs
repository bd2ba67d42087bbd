//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulated time shared by every federate."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Raised when a fractional second count cannot be represented as [`SimTime`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid simulated time {0}: must be finite and non-negative")]
pub struct InvalidSimTime(pub f64);

/// Simulated time in nanoseconds since co-simulation start.
///
/// Serialises as fractional seconds so scenario and configuration files stay
/// readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SimTime(u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    /// Horizon requested by an idle event-driven federate.
    ///
    /// The runtime's largest representable time misbehaves when requested
    /// directly, so a thousandth of it is used instead.
    pub const FAR_FUTURE: SimTime = SimTime(i64::MAX as u64 / 1000);

    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SEC))
    }

    pub fn from_secs_f64(secs: f64) -> Result<Self, InvalidSimTime> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(InvalidSimTime(secs));
        }
        let nanos = (secs * NANOS_PER_SEC as f64).round();
        if nanos >= u64::MAX as f64 {
            return Err(InvalidSimTime(secs));
        }
        Ok(Self(nanos as u64))
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    pub const fn saturating_add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }

    /// Elapsed time since `earlier`, zero when `earlier` is later than `self`.
    pub const fn saturating_sub(self, earlier: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(earlier.0))
    }
}

impl From<Duration> for SimTime {
    fn from(value: Duration) -> Self {
        let nanos = value.as_nanos();
        SimTime(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl TryFrom<f64> for SimTime {
    type Error = InvalidSimTime;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        SimTime::from_secs_f64(value)
    }
}

impl From<SimTime> for f64 {
    fn from(value: SimTime) -> Self {
        value.as_secs_f64()
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.as_secs_f64())
    }
}
