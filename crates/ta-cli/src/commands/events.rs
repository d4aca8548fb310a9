//! Events command for querying the local database.
//!
//! This module outputs stored events as JSONL for debugging.

use anyhow::Result;
use ta_db::Database;

use super::util;

/// Runs the events command, outputting events as JSONL to stdout.
pub fn run(db: &Database, visit: Option<&str>) -> Result<()> {
    let visit = visit.map(util::parse_visit).transpose()?;
    let events = db.list_events(visit.as_ref())?;

    for event in events {
        let json = serde_json::to_string(&event)?;
        println!("{json}");
    }

    Ok(())
}
