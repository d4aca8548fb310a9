//! Categorized charge totals.
//!
//! `Charge` addition is commutative and associative with [`Charge::ZERO`] as
//! identity. The whole correctness strategy of the partition engine depends
//! on "split, charge each half, recombine" reproducing the original total,
//! so every operation here adds componentwise and never drops a bucket.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::timestamp::TimeSpan;
use crate::types::ChargeClass;

/// Accumulated time per charge class.
///
/// Zero entries are elided, so two values that charge the same classes the
/// same amounts are equal regardless of how they were built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorizedTime(BTreeMap<ChargeClass, TimeSpan>);

impl CategorizedTime {
    /// No time in any category.
    pub const ZERO: Self = Self(BTreeMap::new());

    /// The time charged to `class`, zero when absent.
    pub fn get(&self, class: ChargeClass) -> TimeSpan {
        self.0.get(&class).copied().unwrap_or(TimeSpan::ZERO)
    }

    /// Adds `span` to the bucket for `class`.
    pub fn add(&mut self, class: ChargeClass, span: TimeSpan) {
        if !span.is_zero() {
            *self.0.entry(class).or_insert(TimeSpan::ZERO) += span;
        }
    }

    /// The sum over all categories.
    pub fn total(&self) -> TimeSpan {
        self.0.values().copied().sum()
    }

    /// Whether all buckets are zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(class, span)` pairs in class order.
    pub fn iter(&self) -> impl Iterator<Item = (ChargeClass, TimeSpan)> + '_ {
        self.0.iter().map(|(class, span)| (*class, *span))
    }
}

impl FromIterator<(ChargeClass, TimeSpan)> for CategorizedTime {
    fn from_iter<I: IntoIterator<Item = (ChargeClass, TimeSpan)>>(iter: I) -> Self {
        let mut result = Self::ZERO;
        for (class, span) in iter {
            result.add(class, span);
        }
        result
    }
}

impl std::ops::Add for CategorizedTime {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl std::ops::AddAssign for CategorizedTime {
    fn add_assign(&mut self, other: Self) {
        for (class, span) in other.0 {
            self.add(class, span);
        }
    }
}

impl std::iter::Sum for CategorizedTime {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, std::ops::Add::add)
    }
}

impl fmt::Display for CategorizedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(none)");
        }
        let mut first = true;
        for (class, span) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{class}: {span}")?;
            first = false;
        }
        Ok(())
    }
}

/// Total durations bucketed by charge class, plus time whose classification
/// could not be determined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    /// Time attributed to a known charge class.
    pub categorized: CategorizedTime,
    /// Time that could not be attributed to any class.
    pub uncategorized: TimeSpan,
}

impl Charge {
    /// The zero charge: empty categorized map, zero uncategorized.
    pub const ZERO: Self = Self {
        categorized: CategorizedTime::ZERO,
        uncategorized: TimeSpan::ZERO,
    };

    /// The sum over all buckets, categorized and not.
    pub fn total(&self) -> TimeSpan {
        self.categorized.total() + self.uncategorized
    }

    /// Whether every bucket is zero.
    pub fn is_zero(&self) -> bool {
        self.categorized.is_zero() && self.uncategorized.is_zero()
    }
}

impl std::ops::Add for Charge {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl std::ops::AddAssign for Charge {
    fn add_assign(&mut self, other: Self) {
        self.categorized += other.categorized;
        self.uncategorized += other.uncategorized;
    }
}

impl std::iter::Sum for Charge {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, std::ops::Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(program: u64, partner: u64) -> CategorizedTime {
        let mut c = CategorizedTime::ZERO;
        c.add(ChargeClass::Program, TimeSpan::from_micros(program));
        c.add(ChargeClass::Partner, TimeSpan::from_micros(partner));
        c
    }

    #[test]
    fn zero_entries_are_elided() {
        let a = spans(10, 0);
        let mut b = CategorizedTime::ZERO;
        b.add(ChargeClass::Program, TimeSpan::from_micros(10));
        assert_eq!(a, b);
        assert!(CategorizedTime::ZERO.is_zero());
    }

    #[test]
    fn get_defaults_to_zero() {
        let c = spans(10, 0);
        assert_eq!(c.get(ChargeClass::Program), TimeSpan::from_micros(10));
        assert_eq!(c.get(ChargeClass::Partner), TimeSpan::ZERO);
        assert_eq!(c.get(ChargeClass::NonCharged), TimeSpan::ZERO);
    }

    #[test]
    fn addition_is_componentwise() {
        let sum = spans(10, 5) + spans(1, 2);
        assert_eq!(sum, spans(11, 7));
        assert_eq!(sum.total(), TimeSpan::from_micros(18));
    }

    #[test]
    fn addition_is_commutative_and_associative() {
        let a = spans(1, 0);
        let b = spans(0, 2);
        let c = spans(3, 4);
        assert_eq!(a.clone() + b.clone(), b.clone() + a.clone());
        assert_eq!(
            (a.clone() + b.clone()) + c.clone(),
            a.clone() + (b + c)
        );
        assert_eq!(a.clone() + CategorizedTime::ZERO, a);
    }

    #[test]
    fn charge_zero_is_identity() {
        let charge = Charge {
            categorized: spans(10, 5),
            uncategorized: TimeSpan::from_micros(3),
        };
        assert_eq!(charge.clone() + Charge::ZERO, charge);
        assert_eq!(charge.total(), TimeSpan::from_micros(18));
        assert!(Charge::ZERO.is_zero());
    }

    #[test]
    fn charge_sums_both_components() {
        let a = Charge {
            categorized: spans(10, 0),
            uncategorized: TimeSpan::from_micros(1),
        };
        let b = Charge {
            categorized: spans(0, 20),
            uncategorized: TimeSpan::from_micros(2),
        };
        let total: Charge = vec![a, b].into_iter().sum();
        assert_eq!(total.categorized, spans(10, 20));
        assert_eq!(total.uncategorized, TimeSpan::from_micros(3));
    }

    #[test]
    fn serde_roundtrip() {
        let charge = Charge {
            categorized: spans(10, 5),
            uncategorized: TimeSpan::from_micros(7),
        };
        let json = serde_json::to_string(&charge).unwrap();
        let parsed: Charge = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, charge);
    }

    #[test]
    fn display_lists_classes_in_order() {
        let c = spans(10_000_000, 5_000_000);
        assert_eq!(c.to_string(), "partner: 5s, program: 10s");
        assert_eq!(CategorizedTime::ZERO.to_string(), "(none)");
    }
}
