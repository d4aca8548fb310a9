//! Half-open timestamp intervals.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::timestamp::{TimeSpan, Timestamp};

/// A half-open range `[start, end)` over [`Timestamp`].
///
/// The invariant `start <= end` always holds; a zero-length interval is
/// legal and denotes "empty, anchored at a point". Ordering is by
/// `(start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimestampInterval {
    start: Timestamp,
    end: Timestamp,
}

impl TimestampInterval {
    /// The interval covering all representable time.
    pub const ALL: Self = Self {
        start: Timestamp::MIN,
        end: Timestamp::MAX,
    };

    /// Creates the interval between two timestamps, in either order.
    ///
    /// The arguments are normalized so `start <= end`; callers must not
    /// assume argument order is preserved.
    pub fn between(a: Timestamp, b: Timestamp) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// The empty interval anchored at `t`.
    pub const fn empty_at(t: Timestamp) -> Self {
        Self { start: t, end: t }
    }

    /// The inclusive lower bound.
    pub const fn start(self) -> Timestamp {
        self.start
    }

    /// The exclusive upper bound.
    pub const fn end(self) -> Timestamp {
        self.end
    }

    /// Whether the interval contains no instants.
    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// The interval's length.
    pub const fn duration(self) -> TimeSpan {
        TimeSpan::between(self.start, self.end)
    }

    /// Whether `t` falls inside the interval (`start <= t < end`).
    ///
    /// An empty interval contains nothing, including its own anchor.
    pub fn contains(self, t: Timestamp) -> bool {
        self.start <= t && t < self.end
    }

    /// Whether the two intervals share at least one instant.
    pub fn intersects(self, other: Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether the two intervals touch without overlapping.
    pub fn abuts(self, other: Self) -> bool {
        self.end == other.start || other.end == self.start
    }

    /// The shared portion of the two intervals, `None` when disjoint.
    pub fn intersection(self, other: Self) -> Option<Self> {
        if self.intersects(other) {
            Some(Self {
                start: self.start.max(other.start),
                end: self.end.min(other.end),
            })
        } else {
            None
        }
    }

    /// The union of two overlapping or abutting intervals.
    ///
    /// Returns `None` when the intervals are separated, since their union
    /// would not be a single contiguous interval.
    pub fn span(self, other: Self) -> Option<Self> {
        if self.intersects(other) || self.abuts(other) {
            Some(Self {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for TimestampInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl<'de> Deserialize<'de> for TimestampInterval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            start: Timestamp,
            end: Timestamp,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(Self::between(raw.start, raw.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(micros: i64) -> Timestamp {
        Timestamp::from_epoch_micros(micros).unwrap()
    }

    #[test]
    fn between_normalizes_argument_order() {
        let i = TimestampInterval::between(ts(10), ts(5));
        assert_eq!(i.start(), ts(5));
        assert_eq!(i.end(), ts(10));
        assert_eq!(i, TimestampInterval::between(ts(5), ts(10)));
    }

    #[test]
    fn empty_interval_contains_nothing() {
        let i = TimestampInterval::empty_at(ts(5));
        assert!(i.is_empty());
        assert!(!i.contains(ts(5)));
        assert_eq!(i.duration(), TimeSpan::ZERO);
    }

    #[test]
    fn contains_is_half_open() {
        let i = TimestampInterval::between(ts(5), ts(10));
        assert!(i.contains(ts(5)));
        assert!(i.contains(ts(9)));
        assert!(!i.contains(ts(10)));
        assert!(!i.contains(ts(4)));
    }

    #[test]
    fn intersects_requires_shared_instants() {
        let a = TimestampInterval::between(ts(0), ts(10));
        let b = TimestampInterval::between(ts(5), ts(15));
        let c = TimestampInterval::between(ts(10), ts(20));
        assert!(a.intersects(b));
        assert!(b.intersects(a));
        // Abutting intervals share no instant.
        assert!(!a.intersects(c));
        // Empty intervals intersect nothing.
        assert!(!a.intersects(TimestampInterval::empty_at(ts(5))));
    }

    #[test]
    fn abuts_detects_touching_intervals() {
        let a = TimestampInterval::between(ts(0), ts(10));
        let b = TimestampInterval::between(ts(10), ts(20));
        let c = TimestampInterval::between(ts(11), ts(20));
        assert!(a.abuts(b));
        assert!(b.abuts(a));
        assert!(!a.abuts(c));
    }

    #[test]
    fn intersection_clips_to_overlap() {
        let a = TimestampInterval::between(ts(0), ts(10));
        let b = TimestampInterval::between(ts(5), ts(15));
        assert_eq!(
            a.intersection(b),
            Some(TimestampInterval::between(ts(5), ts(10)))
        );
        let c = TimestampInterval::between(ts(20), ts(30));
        assert_eq!(a.intersection(c), None);
    }

    #[test]
    fn span_joins_overlapping_and_abutting() {
        let a = TimestampInterval::between(ts(0), ts(10));
        let b = TimestampInterval::between(ts(10), ts(20));
        let c = TimestampInterval::between(ts(25), ts(30));
        assert_eq!(a.span(b), Some(TimestampInterval::between(ts(0), ts(20))));
        assert_eq!(a.span(c), None);
    }

    #[test]
    fn ordering_is_by_start_then_end() {
        let a = TimestampInterval::between(ts(0), ts(10));
        let b = TimestampInterval::between(ts(0), ts(20));
        let c = TimestampInterval::between(ts(5), ts(6));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn all_interval_spans_full_range() {
        assert!(TimestampInterval::ALL.contains(ts(0)));
        assert!(TimestampInterval::ALL.contains(Timestamp::MIN));
        assert!(!TimestampInterval::ALL.contains(Timestamp::MAX));
    }

    #[test]
    fn deserialization_normalizes() {
        let json = r#"{"start":"1970-01-01T00:00:10.000000Z","end":"1970-01-01T00:00:05.000000Z"}"#;
        let parsed: TimestampInterval = serde_json::from_str(json).unwrap();
        assert!(parsed.start() <= parsed.end());
    }
}
