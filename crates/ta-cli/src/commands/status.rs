//! Status command showing stored visits and recent activity.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use ta_core::VisitId;
use ta_db::Database;

/// Writes a summary of the database to the given writer.
pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    writeln!(writer, "Database: {}", database_path.display())?;

    let visits = db.visits()?;
    if visits.is_empty() {
        writeln!(writer, "No visits recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Visits:")?;
    for summary in visits {
        writeln!(
            writer,
            "- {}: {} events, {} to {}",
            summary.visit_id, summary.event_count, summary.first_event, summary.last_event
        )?;

        let visit = VisitId::new(summary.visit_id)?;
        if let Some(charge) = db.load_charge(&visit)? {
            writeln!(writer, "  last computed charge: {}", charge.total())?;
        }
        let discounts = db.visit_discounts(&visit)?.len();
        if discounts > 0 {
            writeln!(writer, "  discounts: {discounts}")?;
        }
    }
    Ok(())
}
