//! CLI subcommand implementations.

pub mod charge;
pub mod discount;
pub mod events;
pub mod ingest;
pub mod status;
pub mod util;
