//! Accounting contexts and execution events.

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;
use crate::types::{AtomId, ChargeClass, StepId, VisitId};

/// The finest-grained executing unit: an atom/step pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepContext {
    /// The atom the step belongs to.
    pub atom_id: AtomId,
    /// The executing step.
    pub step_id: StepId,
}

impl StepContext {
    pub fn new(atom_id: AtomId, step_id: StepId) -> Self {
        Self { atom_id, step_id }
    }
}

/// What was being charged during an interval.
///
/// The visit and charge class are always known; step-level detail is present
/// only while a step is actively executing (absent during visit-level gaps,
/// e.g. between atoms).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Context {
    /// The visit during which the time elapsed.
    pub visit_id: VisitId,
    /// The billing category for the time.
    pub charge_class: ChargeClass,
    /// The executing atom/step, when one was active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<StepContext>,
}

impl Context {
    /// A visit-level context with no executing step.
    pub const fn unstepped(visit_id: VisitId, charge_class: ChargeClass) -> Self {
        Self {
            visit_id,
            charge_class,
            step: None,
        }
    }

    /// A context for an actively executing step.
    pub const fn stepped(
        visit_id: VisitId,
        charge_class: ChargeClass,
        step: StepContext,
    ) -> Self {
        Self {
            visit_id,
            charge_class,
            step: Some(step),
        }
    }

    /// The atom of the executing step, if any.
    pub fn atom_id(&self) -> Option<&AtomId> {
        self.step.as_ref().map(|s| &s.atom_id)
    }
}

/// A single observed transition: as of `timestamp`, `context` became active.
///
/// Events for one visit and charge class arrive in non-decreasing timestamp
/// order; [`crate::TimeAccountingState::from_events`] verifies the order and
/// panics if it is violated rather than silently reordering, since
/// reordering would mask bugs in the event-recording path and corrupt the
/// billing partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// When the transition was observed.
    pub timestamp: Timestamp,
    /// The context that became active.
    pub context: Context,
}

impl Event {
    pub const fn new(timestamp: Timestamp, context: Context) -> Self {
        Self { timestamp, context }
    }
}
