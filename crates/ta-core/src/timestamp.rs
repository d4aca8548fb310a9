//! Microsecond-precision timestamps and durations.
//!
//! # Range
//!
//! `Timestamp` is restricted to `[0001-01-01T00:00:00Z, 9999-12-31T23:59:59.999999Z]`.
//! The bounds are chosen so that the difference between any two timestamps
//! fits in an `i64` microsecond count, which keeps interval durations and
//! charge sums overflow-free. Constructors and arithmetic return `None`
//! outside the range rather than wrapping or panicking.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Microseconds at 0001-01-01T00:00:00Z.
const MIN_EPOCH_MICROS: i64 = -62_135_596_800_000_000;

/// Microseconds at 9999-12-31T23:59:59.999999Z.
const MAX_EPOCH_MICROS: i64 = 253_402_300_799_999_999;

/// A UTC instant with microsecond resolution.
///
/// Totally ordered, with `MIN` and `MAX` sentinel values. `MAX` is used by
/// [`crate::TimeAccountingState`] as the open end of a still-executing
/// context; billing callers clip with a real upper bound before summing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The earliest representable instant (0001-01-01T00:00:00Z).
    pub const MIN: Self = Self(MIN_EPOCH_MICROS);

    /// The latest representable instant (9999-12-31T23:59:59.999999Z).
    pub const MAX: Self = Self(MAX_EPOCH_MICROS);

    /// Creates a timestamp from microseconds since the Unix epoch.
    ///
    /// Returns `None` if the value falls outside the representable range.
    pub const fn from_epoch_micros(micros: i64) -> Option<Self> {
        if micros < MIN_EPOCH_MICROS || micros > MAX_EPOCH_MICROS {
            None
        } else {
            Some(Self(micros))
        }
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    pub const fn from_epoch_millis(millis: i64) -> Option<Self> {
        match millis.checked_mul(1_000) {
            Some(micros) => Self::from_epoch_micros(micros),
            None => None,
        }
    }

    /// Converts a `chrono` datetime, truncating to microsecond resolution.
    ///
    /// Returns `None` if the datetime falls outside the representable range.
    pub fn from_datetime(dt: DateTime<Utc>) -> Option<Self> {
        Self::from_epoch_micros(dt.timestamp_micros())
    }

    /// The current instant.
    pub fn now() -> Self {
        // Utc::now() is always within range until the year 9999.
        Self::from_datetime(Utc::now()).unwrap_or(Self::MAX)
    }

    /// Microseconds since the Unix epoch.
    pub const fn epoch_micros(self) -> i64 {
        self.0
    }

    /// Converts to a `chrono` datetime.
    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.0)
            .expect("timestamp range is within chrono's representable range")
    }

    /// Adds a signed number of microseconds, `None` when out of range.
    pub const fn plus_micros(self, micros: i64) -> Option<Self> {
        match self.0.checked_add(micros) {
            Some(sum) => Self::from_epoch_micros(sum),
            None => None,
        }
    }

    /// Subtracts a signed number of microseconds, `None` when out of range.
    pub const fn minus_micros(self, micros: i64) -> Option<Self> {
        match self.0.checked_sub(micros) {
            Some(diff) => Self::from_epoch_micros(diff),
            None => None,
        }
    }

    /// Adds a span, `None` when out of range.
    pub fn plus_span(self, span: TimeSpan) -> Option<Self> {
        i64::try_from(span.as_micros())
            .ok()
            .and_then(|micros| self.plus_micros(micros))
    }

    /// Subtracts a span, `None` when out of range.
    pub fn minus_span(self, span: TimeSpan) -> Option<Self> {
        i64::try_from(span.as_micros())
            .ok()
            .and_then(|micros| self.minus_micros(micros))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.to_datetime().to_rfc3339_opts(SecondsFormat::Micros, true)
        )
    }
}

/// Error type for unparseable timestamp strings.
#[derive(Debug, Clone)]
pub struct TimestampParseError(String);

impl fmt::Display for TimestampParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid timestamp: {}", self.0)
    }
}

impl std::error::Error for TimestampParseError {}

impl FromStr for Timestamp {
    type Err = TimestampParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|_| TimestampParseError(s.to_string()))?
            .with_timezone(&Utc);
        Self::from_datetime(dt).ok_or_else(|| TimestampParseError(s.to_string()))
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A non-negative duration in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSpan(u64);

impl TimeSpan {
    /// The zero-length span.
    pub const ZERO: Self = Self(0);

    /// Creates a span from a microsecond count.
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Creates a span from a millisecond count.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000))
    }

    /// Creates a span from a second count.
    pub const fn from_seconds(seconds: u64) -> Self {
        Self(seconds.saturating_mul(1_000_000))
    }

    /// The absolute difference between two timestamps.
    pub const fn between(a: Timestamp, b: Timestamp) -> Self {
        // In-range timestamp differences always fit in i64.
        Self((a.epoch_micros() - b.epoch_micros()).unsigned_abs())
    }

    /// The span as a microsecond count.
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// The span as whole seconds, truncating.
    pub const fn as_seconds(self) -> u64 {
        self.0 / 1_000_000
    }

    /// Whether this span is zero.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition, `None` on overflow.
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Saturating addition.
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction, clamping at zero.
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl std::ops::Add for TimeSpan {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl std::ops::AddAssign for TimeSpan {
    fn add_assign(&mut self, other: Self) {
        *self = self.saturating_add(other);
    }
}

impl std::iter::Sum for TimeSpan {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for TimeSpan {
    /// Formats as `Xh Ym Zs`, omitting leading zero components.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_seconds = self.as_seconds();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            write!(f, "{hours}h {minutes:02}m {seconds:02}s")
        } else if minutes > 0 {
            write!(f, "{minutes}m {seconds:02}s")
        } else {
            write!(f, "{seconds}s")
        }
    }
}

impl Serialize for TimeSpan {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for TimeSpan {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Self)
    }
}
