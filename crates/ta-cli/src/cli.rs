//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Observatory time accounting.
///
/// Records telescope execution events per visit and charges elapsed time to
/// the correct accounting category, with support for administrator-entered
/// corrections.
#[derive(Debug, Parser)]
#[command(name = "ta", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show stored visits and recent activity.
    Status,

    /// Record one execution event.
    Ingest {
        /// The visit the event belongs to.
        #[arg(long)]
        visit: String,

        /// The charge class (program, partner, non_charged).
        #[arg(long)]
        class: String,

        /// Event timestamp, ISO 8601. Defaults to now.
        #[arg(long)]
        time: Option<String>,

        /// The executing atom, when a step is active.
        #[arg(long)]
        atom: Option<String>,

        /// The executing step. Requires --atom.
        #[arg(long, requires = "atom")]
        step: Option<String>,
    },

    /// Dump stored events as JSONL.
    Events {
        /// Restrict to one visit.
        #[arg(long)]
        visit: Option<String>,
    },

    /// Compute and store the charge for a visit.
    Charge {
        /// The visit to charge.
        #[arg(long)]
        visit: String,

        /// Upper bound for the charge, ISO 8601. Defaults to now.
        #[arg(long)]
        until: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Record a time-charge correction for a visit.
    Discount {
        /// The visit to correct.
        #[arg(long)]
        visit: String,

        #[command(subcommand)]
        action: DiscountAction,
    },
}

/// The shape of a time-charge correction.
#[derive(Debug, Subcommand)]
pub enum DiscountAction {
    /// Remove the charge inside an interval.
    Interval {
        /// Interval start, ISO 8601.
        #[arg(long)]
        start: String,

        /// Interval end, ISO 8601.
        #[arg(long)]
        end: String,

        /// Reason for the correction.
        #[arg(long)]
        comment: Option<String>,
    },

    /// Remove the full charge of every atom an interval touches.
    Atoms {
        /// Interval start, ISO 8601.
        #[arg(long)]
        start: String,

        /// Interval end, ISO 8601.
        #[arg(long)]
        end: String,

        /// Reason for the correction.
        #[arg(long)]
        comment: Option<String>,
    },
}
