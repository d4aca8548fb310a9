//! The time-accounting partition engine.
//!
//! A [`TimeAccountingState`] is an ordered, non-overlapping partition of the
//! timeline into `(interval, context)` entries, built from a sorted
//! execution-event stream for one visit and charge class. Every operation is
//! pure: it takes an immutable state and returns a new state or a derived
//! value. The central law, exercised throughout the tests, is charge
//! conservation: however the state is split (`until`/`from`,
//! `between`/`excluding`, atom boundaries), the parts' charges sum back to
//! the whole.

use std::collections::BTreeSet;

use crate::charge::Charge;
use crate::context::{Context, Event};
use crate::interval::TimestampInterval;
use crate::timestamp::{TimeSpan, Timestamp};
use crate::types::AtomId;

/// One entry of the partition: an interval and the context active during it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    interval: TimestampInterval,
    context: Context,
}

impl Entry {
    const fn new(interval: TimestampInterval, context: Context) -> Self {
        Self { interval, context }
    }

    /// The interval this entry covers.
    pub const fn interval(&self) -> TimestampInterval {
        self.interval
    }

    /// The context active during the interval.
    pub const fn context(&self) -> &Context {
        &self.context
    }
}

/// An ordered, disjoint mapping from intervals to accounting contexts.
///
/// Invariants, maintained by construction and by every operation:
/// - intervals are non-empty, mutually disjoint, and increasing;
/// - no two abutting entries carry an equal context (they are merged).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeAccountingState {
    entries: Vec<Entry>,
}

impl TimeAccountingState {
    /// The state with no entries and zero charge.
    pub const EMPTY: Self = Self {
        entries: Vec::new(),
    };

    /// Builds the partition from a sorted event list for one visit.
    ///
    /// Consecutive events `(t1, c1)`, `(t2, c2)` with `t1 < t2` produce the
    /// entry `([t1, t2), c1)`. When two events share a timestamp the later
    /// one supersedes the earlier at that instant. The last event's context
    /// extends to [`Timestamp::MAX`], modeling "still executing" until
    /// superseded or clipped; see [`Self::charge_until`]. An empty event
    /// list yields [`Self::EMPTY`].
    ///
    /// # Panics
    ///
    /// Panics if the events are not in non-decreasing timestamp order. This
    /// is a defect in the event-recording path, not a recoverable runtime
    /// condition; re-sorting here would silently corrupt the billing
    /// partition.
    pub fn from_events(events: &[Event]) -> Self {
        let mut entries = Vec::with_capacity(events.len());

        for pair in events.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            assert!(
                current.timestamp <= next.timestamp,
                "execution events out of order: {} follows {}",
                next.timestamp,
                current.timestamp,
            );
            if current.timestamp < next.timestamp {
                entries.push(Entry::new(
                    TimestampInterval::between(current.timestamp, next.timestamp),
                    current.context.clone(),
                ));
            }
        }

        if let Some(last) = events.last() {
            entries.push(Entry::new(
                TimestampInterval::between(last.timestamp, Timestamp::MAX),
                last.context.clone(),
            ));
        }

        let state = Self {
            entries: normalize(entries),
        };
        tracing::debug!(
            events = events.len(),
            entries = state.entries.len(),
            "built time-accounting state"
        );
        state
    }

    /// The partition entries, in increasing interval order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the state has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Restricts to the sub-partition ending at or before `t`.
    ///
    /// The entry containing `t` is truncated so its end becomes `t`; its
    /// context is preserved in the retained part.
    pub fn until(&self, t: Timestamp) -> Self {
        let entries = self
            .entries
            .iter()
            .filter_map(|entry| {
                if entry.interval.end() <= t {
                    Some(entry.clone())
                } else if entry.interval.start() < t {
                    Some(Entry::new(
                        TimestampInterval::between(entry.interval.start(), t),
                        entry.context.clone(),
                    ))
                } else {
                    None
                }
            })
            .collect();
        Self { entries }
    }

    /// Restricts to the sub-partition from `t` onward.
    ///
    /// The entry containing `t` is truncated so its start becomes `t`.
    #[allow(clippy::should_implement_trait)]
    pub fn from(&self, t: Timestamp) -> Self {
        let entries = self
            .entries
            .iter()
            .filter_map(|entry| {
                if entry.interval.start() >= t {
                    Some(entry.clone())
                } else if entry.interval.end() > t {
                    Some(Entry::new(
                        TimestampInterval::between(t, entry.interval.end()),
                        entry.context.clone(),
                    ))
                } else {
                    None
                }
            })
            .collect();
        Self { entries }
    }

    /// Keeps only the portions of the state overlapping `interval`,
    /// truncating partial overlaps at both ends.
    pub fn between(&self, interval: TimestampInterval) -> Self {
        self.from(interval.start()).until(interval.end())
    }

    /// Keeps everything not overlapping `interval`.
    ///
    /// Entries split by a degenerate interval are re-merged, so
    /// `excluding(empty_at(t))` returns the state unchanged.
    pub fn excluding(&self, interval: TimestampInterval) -> Self {
        let mut entries = self.until(interval.start()).entries;
        entries.extend(self.from(interval.end()).entries);
        Self {
            entries: normalize(entries),
        }
    }

    /// The context active at instant `t`, or `None` in a gap or outside all
    /// entries.
    pub fn context_at(&self, t: Timestamp) -> Option<&Context> {
        let idx = self
            .entries
            .partition_point(|entry| entry.interval.start() <= t);
        let candidate = self.entries.get(idx.checked_sub(1)?)?;
        candidate.interval.contains(t).then(|| &candidate.context)
    }

    /// The distinct atoms with step-context entries anywhere in the state.
    pub fn atoms(&self) -> BTreeSet<AtomId> {
        self.entries
            .iter()
            .filter_map(|entry| entry.context.atom_id().cloned())
            .collect()
    }

    /// The distinct atoms whose step-context entries overlap `interval`.
    pub fn atoms_intersecting(&self, interval: TimestampInterval) -> BTreeSet<AtomId> {
        self.entries
            .iter()
            .filter(|entry| entry.interval.intersects(interval))
            .filter_map(|entry| entry.context.atom_id().cloned())
            .collect()
    }

    /// Returns `(between(interval), excluding(interval))` in one call.
    pub fn partition_on_interval(&self, interval: TimestampInterval) -> (Self, Self) {
        (self.between(interval), self.excluding(interval))
    }

    /// Like [`Self::partition_on_interval`], widened so no atom is split.
    ///
    /// Every entry belonging to an atom that intersects `interval` lands on
    /// the "in" side, including portions outside `interval`; everything else
    /// (including step-less entries inside `interval`) lands "out". The two
    /// sides' atom-id sets are disjoint and union to [`Self::atoms`].
    pub fn partition_on_atom_boundary(&self, interval: TimestampInterval) -> (Self, Self) {
        let touched = self.atoms_intersecting(interval);
        self.partition_entries(|entry| {
            entry
                .context
                .atom_id()
                .is_some_and(|atom| touched.contains(atom))
        })
    }

    /// Splits the state into this atom's time and everything else.
    pub fn partition_on_atom(&self, atom_id: &AtomId) -> (Self, Self) {
        self.partition_entries(|entry| entry.context.atom_id() == Some(atom_id))
    }

    /// Removes `interval` from the state, returning the remaining state and
    /// the exact charge removed.
    pub fn discount_between(&self, interval: TimestampInterval) -> (Self, Charge) {
        let (removed, remaining) = self.partition_on_interval(interval);
        (remaining, removed.charge())
    }

    /// Removes everything outside `interval`, returning the remaining state
    /// and the exact charge removed.
    pub fn discount_excluding(&self, interval: TimestampInterval) -> (Self, Charge) {
        let (remaining, removed) = self.partition_on_interval(interval);
        (remaining, removed.charge())
    }

    /// Removes the full time of every atom touched by `interval`, returning
    /// the remaining state and the exact charge removed.
    pub fn discount_atoms(&self, interval: TimestampInterval) -> (Self, Charge) {
        let (removed, remaining) = self.partition_on_atom_boundary(interval);
        (remaining, removed.charge())
    }

    /// Sums all entries by charge class.
    ///
    /// A pure fold; no hidden state. Note that the final entry of a state
    /// built from a live event stream extends to [`Timestamp::MAX`], so
    /// billing callers must clip with [`Self::charge_until`] (or an explicit
    /// `until`/`between` slice) before summing.
    pub fn charge(&self) -> Charge {
        let categorized = self
            .entries
            .iter()
            .map(|entry| (entry.context.charge_class, entry.interval.duration()))
            .collect();
        Charge {
            categorized,
            uncategorized: TimeSpan::ZERO,
        }
    }

    /// The charge accumulated strictly before `t`.
    ///
    /// This is the charge-computing entry point for billing: it clips the
    /// open-ended final entry at a real upper bound.
    pub fn charge_until(&self, t: Timestamp) -> Charge {
        self.until(t).charge()
    }

    fn partition_entries<F>(&self, mut in_first: F) -> (Self, Self)
    where
        F: FnMut(&Entry) -> bool,
    {
        let (ins, outs) = self
            .entries
            .iter()
            .cloned()
            .partition(|entry| in_first(entry));
        (Self { entries: ins }, Self { entries: outs })
    }
}

/// Drops empty intervals and merges abutting entries with equal contexts.
///
/// Expects entries already in increasing interval order.
fn normalize(entries: Vec<Entry>) -> Vec<Entry> {
    let mut merged: Vec<Entry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.interval.is_empty() {
            continue;
        }
        if let Some(last) = merged.last_mut() {
            if last.context == entry.context {
                if let Some(joined) = last.interval.span(entry.interval) {
                    last.interval = joined;
                    continue;
                }
            }
        }
        merged.push(entry);
    }
    merged
}
