//! Discount command for recording time-charge corrections.
//!
//! A discount is stored, not applied destructively: the event log stays
//! intact and every later charge computation replays the visit's discounts
//! in entry order. This command also reports what the new correction removes
//! from the charge as it stands right now.

use anyhow::Result;

use ta_core::{Timestamp, TimestampInterval};
use ta_db::{Database, DiscountKind, DiscountRecord};

use super::{charge, util};
use crate::cli::DiscountAction;

/// Records one correction for a visit and prints the charge it removes.
pub fn run(db: &mut Database, visit: &str, action: &DiscountAction) -> Result<()> {
    let visit = util::parse_visit(visit)?;
    let (kind, start, end, comment) = match action {
        DiscountAction::Interval {
            start,
            end,
            comment,
        } => (DiscountKind::Interval, start, end, comment),
        DiscountAction::Atoms {
            start,
            end,
            comment,
        } => (DiscountKind::Atoms, start, end, comment),
    };
    let start = util::parse_timestamp(start, "start")?;
    let end = util::parse_timestamp(end, "end")?;
    let interval = TimestampInterval::between(start, end);

    // Replay existing discounts first so the reported removal reflects what
    // this correction changes on top of them.
    let (state, _) = charge::discounted_state(db, &visit, Timestamp::now())?;
    let (_, removed) = match kind {
        DiscountKind::Interval => state.discount_between(interval),
        DiscountKind::Atoms => state.discount_atoms(interval),
    };

    let record = DiscountRecord::new(&visit, kind, start, end, comment.clone());
    db.insert_discount(&record)?;
    tracing::debug!(id = %record.id, %visit, kind = kind.as_str(), "discount recorded");

    println!(
        "Recorded {} discount for visit {visit}: removes {}",
        kind.as_str(),
        removed.total()
    );
    Ok(())
}
