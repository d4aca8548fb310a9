//! Time-accounting engine for observatory science operations.
//!
//! This crate contains the fundamental types and logic for:
//! - Timestamps and half-open intervals with checked arithmetic
//! - Accounting contexts: which visit, charge class, and atom/step was
//!   executing during an interval
//! - `TimeAccountingState`: a disjoint partition of the timeline built from
//!   an ordered execution-event stream, with slicing, atom-aware
//!   partitioning, and discount operations
//! - `Charge`: categorized time totals with a conservation-preserving sum

pub mod charge;
pub mod context;
pub mod interval;
pub mod state;
pub mod timestamp;
pub mod types;

pub use charge::{CategorizedTime, Charge};
pub use context::{Context, Event, StepContext};
pub use interval::TimestampInterval;
pub use state::{Entry, TimeAccountingState};
pub use timestamp::{TimeSpan, Timestamp, TimestampParseError};
pub use types::{AtomId, ChargeClass, StepId, UnknownChargeClass, ValidationError, VisitId};
