//! Target command: look up the value governing the current bucket.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;

use ct_core::{ScheduleConfig, ScheduleStore};
use ct_db::Database;

use super::resolve;
use super::util::format_instant;
use crate::Config;

#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Only consult the stored schedule; never re-resolve.
    #[arg(long)]
    pub no_refresh: bool,

    /// Fail instead of printing the default target when nothing is scheduled.
    #[arg(long)]
    pub strict: bool,
}

/// Returns the scheduled target for `now`, if any.
///
/// The stored schedule is consulted first. When it misses `now`, or was built
/// with a different granularity than configured, the events are resolved again
/// unless `refresh` is false. Imports clear the stored schedule, so new events
/// are picked up by the next call.
pub fn current_target(
    db: &mut Database,
    config: &Config,
    settings: &ScheduleConfig,
    now: DateTime<Utc>,
    refresh: bool,
) -> Result<Option<i32>> {
    let stored = db.load().context("failed to load schedule")?;
    match stored {
        Some(schedule) if schedule.granularity() != settings.granularity => {
            tracing::warn!(
                stored = %schedule.granularity(),
                configured = %settings.granularity,
                "stored schedule granularity differs from configuration"
            );
        }
        Some(schedule) => {
            if let Some(value) = schedule.lookup_now(now) {
                return Ok(Some(value));
            }
            tracing::debug!(now = %now, "stored schedule has no target for now");
        }
        None => tracing::debug!("no stored schedule"),
    }

    if !refresh {
        return Ok(None);
    }
    let schedule = resolve::refresh(db, config, settings, now)?;
    Ok(schedule.lookup_now(now))
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    args: &TargetArgs,
    config: &Config,
    settings: &ScheduleConfig,
    now: DateTime<Utc>,
) -> Result<()> {
    let target = current_target(db, config, settings, now, !args.no_refresh)?;
    let value = match target {
        Some(value) => value,
        None if args.strict => {
            anyhow::bail!("no target scheduled for {}", format_instant(now))
        }
        None => {
            tracing::debug!(default = config.default_target, "using default target");
            config.default_target
        }
    };
    writeln!(writer, "{value}")?;
    Ok(())
}
