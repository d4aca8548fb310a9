//! Time-accounting CLI library.
//!
//! This crate provides the CLI interface for the time-accounting engine.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, DiscountAction};
pub use config::Config;
