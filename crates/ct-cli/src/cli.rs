//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::import::ImportArgs;
use crate::commands::target::TargetArgs;

/// Calendar-driven targets.
///
/// Turns integer-titled calendar events into a bucketed schedule of target
/// values and answers what the target is right now.
#[derive(Debug, Parser)]
#[command(name = "ct", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Evaluate at this time instead of the current time.
    ///
    /// Accepts RFC 3339 (e.g., 2025-01-15T09:00:00Z) or relative time
    /// (e.g., "2 hours ago").
    #[arg(long, global = true, value_name = "DATETIME")]
    pub now: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import calendar events from stdin (JSON Lines).
    Import(ImportArgs),

    /// Resolve stored events into a target schedule and save it.
    Resolve,

    /// Print the target for the current bucket.
    Target(TargetArgs),

    /// Print the stored schedule.
    Schedule {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show database, event and schedule status.
    Status,
}
