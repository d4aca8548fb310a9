//! Ingest command for recording execution events.

use anyhow::{Context, Result, bail};
use ta_db::{Database, EventRecord};

use ta_core::{AtomId, ChargeClass, StepContext, StepId};

use super::util;

/// Records one execution event for a visit.
pub fn run(
    db: &mut Database,
    visit: &str,
    class: &str,
    time: Option<&str>,
    atom: Option<&str>,
    step: Option<&str>,
) -> Result<()> {
    let visit = util::parse_visit(visit)?;
    let class: ChargeClass = class.parse().context("invalid --class")?;
    let timestamp = util::parse_timestamp_or_now(time, "time")?;

    let step = match (atom, step) {
        (Some(atom), Some(step)) => Some(StepContext::new(
            AtomId::new(atom).context("invalid --atom")?,
            StepId::new(step).context("invalid --step")?,
        )),
        (None, None) => None,
        _ => bail!("--atom and --step must be given together"),
    };

    let record = EventRecord::new(&visit, class, timestamp, step.as_ref());
    let inserted = db.insert_events(std::slice::from_ref(&record))?;
    tracing::debug!(id = %record.id, %visit, inserted, "event recorded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_records_event() {
        let mut db = Database::open_in_memory().unwrap();
        run(
            &mut db,
            "v-1",
            "program",
            Some("1970-01-01T00:00:10Z"),
            None,
            None,
        )
        .unwrap();

        let events = db.list_events(None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].visit_id, "v-1");
        assert_eq!(events[0].charge_class, "program");
        assert_eq!(events[0].atom_id, None);
    }

    #[test]
    fn ingest_records_step_context() {
        let mut db = Database::open_in_memory().unwrap();
        run(
            &mut db,
            "v-1",
            "partner",
            Some("1970-01-01T00:00:10Z"),
            Some("a-1"),
            Some("s-1"),
        )
        .unwrap();

        let events = db.list_events(None).unwrap();
        assert_eq!(events[0].atom_id.as_deref(), Some("a-1"));
        assert_eq!(events[0].step_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn ingest_rejects_lone_atom() {
        let mut db = Database::open_in_memory().unwrap();
        let result = run(
            &mut db,
            "v-1",
            "program",
            Some("1970-01-01T00:00:10Z"),
            Some("a-1"),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn ingest_rejects_unknown_class() {
        let mut db = Database::open_in_memory().unwrap();
        let result = run(&mut db, "v-1", "engineering", None, None, None);
        assert!(result.is_err());
    }
}
