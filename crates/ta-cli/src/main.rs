use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ta_cli::commands::{charge, discount, events, ingest, status};
use ta_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(ta_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = ta_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut std::io::stdout(), &db, &config.database_path)?;
        }
        Some(Commands::Ingest {
            visit,
            class,
            time,
            atom,
            step,
        }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            ingest::run(
                &mut db,
                visit,
                class,
                time.as_deref(),
                atom.as_deref(),
                step.as_deref(),
            )?;
        }
        Some(Commands::Events { visit }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            events::run(&db, visit.as_deref())?;
        }
        Some(Commands::Charge { visit, until, json }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            charge::run(&mut db, visit, until.as_deref(), *json)?;
        }
        Some(Commands::Discount { visit, action }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            discount::run(&mut db, visit, action)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
