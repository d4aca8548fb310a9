//! Shared helpers for subcommands.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use ta_core::{Timestamp, VisitId};

/// Parses an ISO 8601 timestamp argument.
pub fn parse_timestamp(s: &str, name: &str) -> Result<Timestamp> {
    let dt = DateTime::parse_from_rfc3339(s)
        .with_context(|| {
            format!("invalid --{name} timestamp, expected ISO 8601 (e.g., 2025-01-29T12:00:00Z)")
        })?
        .with_timezone(&Utc);
    Timestamp::from_datetime(dt)
        .ok_or_else(|| anyhow!("--{name} timestamp is outside the representable range"))
}

/// Parses an optional timestamp argument, defaulting to now.
pub fn parse_timestamp_or_now(s: Option<&str>, name: &str) -> Result<Timestamp> {
    match s {
        Some(s) => parse_timestamp(s, name),
        None => Ok(Timestamp::now()),
    }
}

/// Parses a visit ID argument.
pub fn parse_visit(s: &str) -> Result<VisitId> {
    VisitId::new(s).context("invalid --visit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timestamp_accepts_rfc3339() {
        let t = parse_timestamp("1970-01-01T00:00:30Z", "time").unwrap();
        assert_eq!(t, Timestamp::from_epoch_micros(30_000_000).unwrap());
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        let err = parse_timestamp("yesterday", "time").unwrap_err();
        assert!(err.to_string().contains("--time"));
    }

    #[test]
    fn parse_timestamp_or_now_defaults() {
        let before = Timestamp::now();
        let t = parse_timestamp_or_now(None, "time").unwrap();
        assert!(t >= before);
    }

    #[test]
    fn parse_visit_rejects_empty() {
        assert!(parse_visit("").is_err());
        assert!(parse_visit("v-1").is_ok());
    }
}
