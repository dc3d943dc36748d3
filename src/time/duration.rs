//! Simulation time is measured in signed microsecond ticks.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// A signed span of simulated time, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Duration(i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);
    pub const MICROSECOND: Duration = Duration(1);
    pub const MILLISECOND: Duration = Duration(1_000);
    pub const SECOND: Duration = Duration(1_000_000);
    pub const MINUTE: Duration = Duration(60 * 1_000_000);
    pub const HOUR: Duration = Duration(60 * 60 * 1_000_000);
    pub const MIN: Duration = Duration(i64::MIN);
    pub const MAX: Duration = Duration(i64::MAX);

    pub const fn from_micros(micros: i64) -> Self {
        Duration(micros)
    }

    /// `quantity` multiples of `unit`, saturating at the representable range.
    pub const fn of(quantity: i64, unit: Duration) -> Self {
        Duration(quantity.saturating_mul(unit.0))
    }

    pub const fn micros(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / Self::SECOND.0 as f64
    }

    /// Ratio of this duration to `unit`, as a float.
    pub fn ratio_of(self, unit: Duration) -> f64 {
        self.0 as f64 / unit.0 as f64
    }

    pub fn saturating_add(self, other: Duration) -> Duration {
        Duration(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Duration) -> Duration {
        Duration(self.0.saturating_sub(other.0))
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Duration {
    type Output = Duration;
    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0 + rhs.0)
    }
}

impl Sub for Duration {
    type Output = Duration;
    fn sub(self, rhs: Duration) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl Neg for Duration {
    type Output = Duration;
    fn neg(self) -> Duration {
        Duration(-self.0)
    }
}

impl Mul<i64> for Duration {
    type Output = Duration;
    fn mul(self, rhs: i64) -> Duration {
        Duration(self.0 * rhs)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Duration::MIN => write!(f, "-inf"),
            Duration::MAX => write!(f, "+inf"),
            Duration(us) => write!(f, "{}us", us),
        }
    }
}

/// An absolute instant, as microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_epoch_micros(micros: i64) -> Self {
        Timestamp(micros)
    }

    pub const fn epoch_micros(self) -> i64 {
        self.0
    }

    pub fn plus(self, offset: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(offset.micros()))
    }

    /// Elapsed time from `earlier` to this instant.
    pub fn since(self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}
