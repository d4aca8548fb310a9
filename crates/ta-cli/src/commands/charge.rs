//! Charge command: rebuild a visit's accounting state and bill it.
//!
//! The engine's open-ended final entry means a live state runs to the end of
//! representable time; everything here clips at an explicit upper bound
//! (`--until`, default now) before any charge is computed.

use anyhow::{Context, Result};
use serde::Serialize;

use ta_core::{Charge, TimeAccountingState, Timestamp, TimestampInterval, VisitId};
use ta_db::{Database, DiscountKind};

use super::util;

/// One stored correction and the charge it removed.
#[derive(Debug, Serialize)]
pub struct AppliedDiscount {
    pub id: String,
    pub kind: DiscountKind,
    pub comment: Option<String>,
    pub removed: Charge,
}

/// Computed charge data for a visit.
#[derive(Debug, Serialize)]
pub struct ChargeReport {
    pub visit: String,
    pub until: Timestamp,
    pub charge: Charge,
    pub discounts: Vec<AppliedDiscount>,
}

/// Rebuilds a visit's state clipped at `until`, with stored discounts
/// applied in entry order.
pub fn discounted_state(
    db: &Database,
    visit: &VisitId,
    until: Timestamp,
) -> Result<(TimeAccountingState, Vec<AppliedDiscount>)> {
    let events = db.visit_events(visit)?;
    let mut state = TimeAccountingState::from_events(&events).until(until);

    let mut applied = Vec::new();
    for discount in db.visit_discounts(visit)? {
        let start: Timestamp = discount
            .start
            .parse()
            .with_context(|| format!("stored discount {} has a bad start", discount.id))?;
        let end: Timestamp = discount
            .end
            .parse()
            .with_context(|| format!("stored discount {} has a bad end", discount.id))?;
        let interval = TimestampInterval::between(start, end);

        let (remaining, removed) = match discount.kind {
            DiscountKind::Interval => state.discount_between(interval),
            DiscountKind::Atoms => state.discount_atoms(interval),
        };
        state = remaining;
        applied.push(AppliedDiscount {
            id: discount.id,
            kind: discount.kind,
            comment: discount.comment,
            removed,
        });
    }

    Ok((state, applied))
}

/// Computes the report without persisting anything.
pub fn compute(db: &Database, visit: &VisitId, until: Timestamp) -> Result<ChargeReport> {
    let (state, discounts) = discounted_state(db, visit, until)?;
    Ok(ChargeReport {
        visit: visit.to_string(),
        until,
        charge: state.charge(),
        discounts,
    })
}

/// Runs the charge command: compute, persist the rollup, print.
pub fn run(db: &mut Database, visit: &str, until: Option<&str>, json: bool) -> Result<()> {
    let visit = util::parse_visit(visit)?;
    let until = util::parse_timestamp_or_now(until, "until")?;

    let report = compute(db, &visit, until)?;
    db.store_charge(&visit, &report.charge)
        .context("failed to persist charge rollup")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render(&report));
    }
    Ok(())
}

fn render(report: &ChargeReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Charge for visit {} until {}",
        report.visit, report.until
    ));

    if report.charge.categorized.is_zero() {
        lines.push("  (none)".to_string());
    }
    for (class, span) in report.charge.categorized.iter() {
        lines.push(format!("  {class}: {span}"));
    }
    if !report.charge.uncategorized.is_zero() {
        lines.push(format!("  uncategorized: {}", report.charge.uncategorized));
    }
    for discount in &report.discounts {
        let comment = discount.comment.as_deref().unwrap_or("no comment");
        lines.push(format!(
            "  discount {} ({comment}): removed {}",
            discount.kind.as_str(),
            discount.removed.total()
        ));
    }
    lines.push(format!("Total: {}", report.charge.total()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use ta_core::{AtomId, ChargeClass, StepContext, StepId, TimeSpan};
    use ta_db::{DiscountRecord, EventRecord};

    fn visit() -> VisitId {
        VisitId::new("v-1").unwrap()
    }

    fn ts(seconds: i64) -> Timestamp {
        Timestamp::from_epoch_micros(seconds * 1_000_000).unwrap()
    }

    fn step(atom: &str, step: &str) -> StepContext {
        StepContext::new(AtomId::new(atom).unwrap(), StepId::new(step).unwrap())
    }

    fn seed_events(db: &mut Database) {
        db.insert_events(&[
            EventRecord::new(&visit(), ChargeClass::Program, ts(0), None),
            EventRecord::new(
                &visit(),
                ChargeClass::Program,
                ts(10),
                Some(&step("a-1", "s-1")),
            ),
            EventRecord::new(&visit(), ChargeClass::Program, ts(20), None),
        ])
        .unwrap();
    }

    #[test]
    fn compute_clips_at_until() {
        let mut db = Database::open_in_memory().unwrap();
        seed_events(&mut db);

        let report = compute(&db, &visit(), ts(30)).unwrap();
        assert_eq!(
            report.charge.categorized.get(ChargeClass::Program),
            TimeSpan::from_seconds(30)
        );
        assert!(report.discounts.is_empty());
    }

    #[test]
    fn compute_applies_interval_discounts() {
        let mut db = Database::open_in_memory().unwrap();
        seed_events(&mut db);
        db.insert_discount(&DiscountRecord::new(
            &visit(),
            DiscountKind::Interval,
            ts(10),
            ts(20),
            Some("guider fault".to_string()),
        ))
        .unwrap();

        let report = compute(&db, &visit(), ts(30)).unwrap();
        assert_eq!(
            report.charge.categorized.get(ChargeClass::Program),
            TimeSpan::from_seconds(20)
        );
        assert_eq!(report.discounts.len(), 1);
        assert_eq!(report.discounts[0].removed.total(), TimeSpan::from_seconds(10));

        // Conservation: remaining plus removed equals the undiscounted total.
        let total: TimeSpan = report.charge.total() + report.discounts[0].removed.total();
        assert_eq!(total, TimeSpan::from_seconds(30));
    }

    #[test]
    fn compute_applies_atom_discounts_whole() {
        let mut db = Database::open_in_memory().unwrap();
        seed_events(&mut db);
        // The window only clips the step entry, but the whole atom goes.
        db.insert_discount(&DiscountRecord::new(
            &visit(),
            DiscountKind::Atoms,
            ts(15),
            ts(16),
            None,
        ))
        .unwrap();

        let report = compute(&db, &visit(), ts(30)).unwrap();
        assert_eq!(report.discounts[0].removed.total(), TimeSpan::from_seconds(10));
        assert_eq!(report.charge.total(), TimeSpan::from_seconds(20));
    }

    #[test]
    fn compute_on_unknown_visit_is_empty() {
        let db = Database::open_in_memory().unwrap();
        let report = compute(&db, &visit(), ts(30)).unwrap();
        assert!(report.charge.is_zero());
    }

    #[test]
    fn render_lists_classes_and_discounts() {
        let mut db = Database::open_in_memory().unwrap();
        seed_events(&mut db);
        db.insert_discount(&DiscountRecord::new(
            &visit(),
            DiscountKind::Interval,
            ts(10),
            ts(20),
            Some("guider fault".to_string()),
        ))
        .unwrap();

        let report = compute(&db, &visit(), ts(30)).unwrap();
        assert_snapshot!(render(&report), @r"
Charge for visit v-1 until 1970-01-01T00:00:30.000000Z
  program: 20s
  discount interval (guider fault): removed 10s
Total: 20s
");
    }

    #[test]
    fn render_handles_empty_charge() {
        let db = Database::open_in_memory().unwrap();
        let report = compute(&db, &visit(), ts(30)).unwrap();
        assert_snapshot!(render(&report), @r"
Charge for visit v-1 until 1970-01-01T00:00:30.000000Z
  (none)
Total: 0s
");
    }
}
