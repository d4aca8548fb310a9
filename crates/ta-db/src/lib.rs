//! Storage layer for the time-accounting engine.
//!
//! Provides persistence for execution events, discount corrections, and
//! computed charge rollups using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with microsecond
//! precision (e.g., `2024-01-15T10:30:00.000000Z`), the display form of
//! [`ta_core::Timestamp`]. Lexicographic ordering matches chronological
//! ordering, so `ORDER BY timestamp` returns events in the order the engine
//! requires.
//!
//! ## Write Pattern
//!
//! Charge rollups follow "load event list, compute, write result": the
//! engine never reads its own output, and each rollup write happens in a
//! single transaction so readers never observe a partial charge.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use ta_core::{
    CategorizedTime, Charge, ChargeClass, Context, Event, StepContext, TimeSpan, Timestamp,
    VisitId,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for record {id}: {timestamp}")]
    TimestampParse { id: String, timestamp: String },
    /// A stored row violates a domain invariant.
    #[error("invalid record {id}: {message}")]
    InvalidRecord { id: String, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A raw execution event ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub id: String,
    pub visit_id: String,
    pub charge_class: String,
    pub timestamp: String,
    pub atom_id: Option<String>,
    pub step_id: Option<String>,
}

impl EventRecord {
    /// Builds a record from core values, minting a fresh row ID.
    pub fn new(
        visit_id: &VisitId,
        charge_class: ChargeClass,
        timestamp: Timestamp,
        step: Option<&StepContext>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            visit_id: visit_id.to_string(),
            charge_class: charge_class.to_string(),
            timestamp: timestamp.to_string(),
            atom_id: step.map(|s| s.atom_id.to_string()),
            step_id: step.map(|s| s.step_id.to_string()),
        }
    }
}

/// The shape of an administrator-entered time-charge correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// Remove the charge inside the interval.
    Interval,
    /// Remove the full charge of every atom the interval touches.
    Atoms,
}

impl DiscountKind {
    /// String representation for database storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::Atoms => "atoms",
        }
    }

    fn parse(s: &str, id: &str) -> Result<Self, DbError> {
        match s {
            "interval" => Ok(Self::Interval),
            "atoms" => Ok(Self::Atoms),
            _ => Err(DbError::InvalidRecord {
                id: id.to_string(),
                message: format!("unknown discount kind: {s}"),
            }),
        }
    }
}

/// A stored time-charge correction, keyed by visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscountRecord {
    pub id: String,
    pub visit_id: String,
    pub kind: DiscountKind,
    pub start: String,
    pub end: String,
    pub comment: Option<String>,
    pub created_at: String,
}

impl DiscountRecord {
    /// Builds a record from core values, minting a fresh row ID.
    pub fn new(
        visit_id: &VisitId,
        kind: DiscountKind,
        start: Timestamp,
        end: Timestamp,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            visit_id: visit_id.to_string(),
            kind,
            start: start.to_string(),
            end: end.to_string(),
            comment,
            created_at: Timestamp::now().to_string(),
        }
    }
}

/// Per-visit event summary for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitSummary {
    pub visit_id: String,
    pub event_count: i64,
    pub first_event: String,
    pub last_event: String,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Events table: one row per observed context transition
            -- timestamp: RFC 3339 with microseconds (e.g., '2024-01-15T10:30:00.000000Z')
            -- atom_id/step_id: both present while a step executes, both NULL otherwise
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                visit_id TEXT NOT NULL,
                charge_class TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                atom_id TEXT,
                step_id TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_events_visit_timestamp
                ON events(visit_id, timestamp);

            CREATE TABLE IF NOT EXISTS discounts (
                id TEXT PRIMARY KEY,
                visit_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                comment TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_discounts_visit ON discounts(visit_id);

            CREATE TABLE IF NOT EXISTS visit_charges (
                visit_id TEXT NOT NULL,
                charge_class TEXT NOT NULL,
                micros INTEGER NOT NULL,
                PRIMARY KEY (visit_id, charge_class)
            );

            CREATE TABLE IF NOT EXISTS visit_charge_meta (
                visit_id TEXT PRIMARY KEY,
                uncategorized_micros INTEGER NOT NULL,
                computed_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of events, ignoring duplicates by ID.
    pub fn insert_events(&mut self, events: &[EventRecord]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO events
                (id, visit_id, charge_class, timestamp, atom_id, step_id)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
            )?;
            for event in events {
                inserted += stmt.execute(params![
                    event.id,
                    event.visit_id,
                    event.charge_class,
                    event.timestamp,
                    event.atom_id,
                    event.step_id,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Lists raw event rows, optionally for a single visit, ordered by
    /// timestamp then ID.
    pub fn list_events(&self, visit: Option<&VisitId>) -> Result<Vec<EventRecord>, DbError> {
        let base = "
            SELECT id, visit_id, charge_class, timestamp, atom_id, step_id
            FROM events
            ";
        let order = " ORDER BY timestamp ASC, id ASC";
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(EventRecord {
                id: row.get(0)?,
                visit_id: row.get(1)?,
                charge_class: row.get(2)?,
                timestamp: row.get(3)?,
                atom_id: row.get(4)?,
                step_id: row.get(5)?,
            })
        };

        let mut events = Vec::new();
        match visit {
            Some(visit) => {
                let sql = format!("{base} WHERE visit_id = ? {order}");
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map([visit.as_str()], map_row)?;
                for row in rows {
                    events.push(row?);
                }
            }
            None => {
                let sql = format!("{base} {order}");
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map([], map_row)?;
                for row in rows {
                    events.push(row?);
                }
            }
        }
        Ok(events)
    }

    /// Loads a visit's events as core values, ordered for the engine.
    ///
    /// Rows are returned in `(timestamp, id)` order, satisfying the sorted
    /// precondition of `TimeAccountingState::from_events`.
    pub fn visit_events(&self, visit: &VisitId) -> Result<Vec<Event>, DbError> {
        let records = self.list_events(Some(visit))?;
        records.iter().map(event_from_record).collect()
    }

    /// Summarizes stored visits, most recently active first.
    pub fn visits(&self) -> Result<Vec<VisitSummary>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT visit_id, COUNT(*), MIN(timestamp), MAX(timestamp)
            FROM events
            GROUP BY visit_id
            ORDER BY MAX(timestamp) DESC, visit_id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(VisitSummary {
                visit_id: row.get(0)?,
                event_count: row.get(1)?,
                first_event: row.get(2)?,
                last_event: row.get(3)?,
            })
        })?;
        let mut visits = Vec::new();
        for row in rows {
            visits.push(row?);
        }
        Ok(visits)
    }

    /// Inserts a discount correction.
    pub fn insert_discount(&mut self, discount: &DiscountRecord) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO discounts (id, visit_id, kind, start_time, end_time, comment, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                discount.id,
                discount.visit_id,
                discount.kind.as_str(),
                discount.start,
                discount.end,
                discount.comment,
                discount.created_at,
            ],
        )?;
        Ok(())
    }

    /// Lists a visit's discounts in entry order (creation time, then ID).
    pub fn visit_discounts(&self, visit: &VisitId) -> Result<Vec<DiscountRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, visit_id, kind, start_time, end_time, comment, created_at
            FROM discounts
            WHERE visit_id = ?
            ORDER BY created_at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([visit.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;
        let mut discounts = Vec::new();
        for row in rows {
            let (id, visit_id, kind, start, end, comment, created_at) = row?;
            let kind = DiscountKind::parse(&kind, &id)?;
            discounts.push(DiscountRecord {
                id,
                visit_id,
                kind,
                start,
                end,
                comment,
                created_at,
            });
        }
        Ok(discounts)
    }

    /// Stores a computed charge rollup for a visit, replacing any previous
    /// rollup in a single transaction.
    pub fn store_charge(&mut self, visit: &VisitId, charge: &Charge) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM visit_charges WHERE visit_id = ?",
            [visit.as_str()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO visit_charges (visit_id, charge_class, micros) VALUES (?, ?, ?)",
            )?;
            for (class, span) in charge.categorized.iter() {
                stmt.execute(params![
                    visit.as_str(),
                    class.as_str(),
                    micros_to_i64(span, visit)?,
                ])?;
            }
        }
        tx.execute(
            "
            INSERT INTO visit_charge_meta (visit_id, uncategorized_micros, computed_at)
            VALUES (?, ?, ?)
            ON CONFLICT (visit_id) DO UPDATE
            SET uncategorized_micros = excluded.uncategorized_micros,
                computed_at = excluded.computed_at
            ",
            params![
                visit.as_str(),
                micros_to_i64(charge.uncategorized, visit)?,
                Timestamp::now().to_string(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Loads the stored charge rollup for a visit, `None` if never computed.
    pub fn load_charge(&self, visit: &VisitId) -> Result<Option<Charge>, DbError> {
        let uncategorized: Option<i64> = self
            .conn
            .query_row(
                "SELECT uncategorized_micros FROM visit_charge_meta WHERE visit_id = ?",
                [visit.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(uncategorized) = uncategorized else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT charge_class, micros FROM visit_charges WHERE visit_id = ?",
        )?;
        let rows = stmt.query_map([visit.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut categorized = CategorizedTime::ZERO;
        for row in rows {
            let (class, micros) = row?;
            let class: ChargeClass = class.parse().map_err(|_| DbError::InvalidRecord {
                id: visit.to_string(),
                message: format!("unknown charge class in rollup: {class}"),
            })?;
            categorized.add(class, micros_from_i64(micros, visit)?);
        }

        Ok(Some(Charge {
            categorized,
            uncategorized: micros_from_i64(uncategorized, visit)?,
        }))
    }
}

/// Converts a stored row into a core event, validating domain invariants.
fn event_from_record(record: &EventRecord) -> Result<Event, DbError> {
    let visit_id = VisitId::new(record.visit_id.clone()).map_err(|e| DbError::InvalidRecord {
        id: record.id.clone(),
        message: e.to_string(),
    })?;
    let charge_class: ChargeClass =
        record
            .charge_class
            .parse()
            .map_err(|_| DbError::InvalidRecord {
                id: record.id.clone(),
                message: format!("unknown charge class: {}", record.charge_class),
            })?;
    let timestamp: Timestamp =
        record
            .timestamp
            .parse()
            .map_err(|_| DbError::TimestampParse {
                id: record.id.clone(),
                timestamp: record.timestamp.clone(),
            })?;

    let step = match (&record.atom_id, &record.step_id) {
        (Some(atom), Some(step)) => {
            let atom = ta_core::AtomId::new(atom.clone()).map_err(|e| DbError::InvalidRecord {
                id: record.id.clone(),
                message: e.to_string(),
            })?;
            let step = ta_core::StepId::new(step.clone()).map_err(|e| DbError::InvalidRecord {
                id: record.id.clone(),
                message: e.to_string(),
            })?;
            Some(StepContext::new(atom, step))
        }
        (None, None) => None,
        _ => {
            return Err(DbError::InvalidRecord {
                id: record.id.clone(),
                message: "atom_id and step_id must both be present or both absent".to_string(),
            });
        }
    };

    let context = Context {
        visit_id,
        charge_class,
        step,
    };
    Ok(Event::new(timestamp, context))
}

fn micros_to_i64(span: TimeSpan, visit: &VisitId) -> Result<i64, DbError> {
    i64::try_from(span.as_micros()).map_err(|_| DbError::InvalidRecord {
        id: visit.to_string(),
        message: "charge rollup exceeds storable range".to_string(),
    })
}

fn micros_from_i64(micros: i64, visit: &VisitId) -> Result<TimeSpan, DbError> {
    u64::try_from(micros)
        .map(TimeSpan::from_micros)
        .map_err(|_| DbError::InvalidRecord {
            id: visit.to_string(),
            message: format!("negative charge rollup: {micros}"),
        })
}
