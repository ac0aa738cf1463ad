use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ct_cli::commands::{import, resolve, schedule, status, target, util};
use ct_cli::{Cli, Commands, Config};
use ct_core::ScheduleConfig;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(ct_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = ct_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((db, config))
}

fn schedule_config(config: &Config) -> Result<ScheduleConfig> {
    config
        .schedule_config()
        .context("invalid schedule configuration")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so stdout stays machine-readable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let now = match cli.now.as_deref() {
        Some(value) => util::parse_datetime(value)?,
        None => Utc::now(),
    };
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Some(Commands::Import(args)) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let summary = import::run(io::stdin().lock(), &mut db, args, &config)?;
            eprintln!(
                "Imported {} new events ({} read)",
                summary.inserted, summary.read
            );
        }
        Some(Commands::Resolve) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let settings = schedule_config(&config)?;
            resolve::run(&mut stdout, &mut db, &config, &settings, now)?;
        }
        Some(Commands::Target(args)) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let settings = schedule_config(&config)?;
            target::run(&mut stdout, &mut db, args, &config, &settings, now)?;
        }
        Some(Commands::Schedule { json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            schedule::run(&mut stdout, &db, *json)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, &db, &config, now)?;
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
