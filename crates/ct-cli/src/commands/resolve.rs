//! Resolve command: turn stored events into a saved target schedule.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use ct_core::{RawEvent, Schedule, ScheduleConfig, ScheduleStore, buckets};
use ct_db::Database;

use super::util::format_instant;
use crate::Config;

/// Resolves the configured calendar's events as of `now` and saves the result.
pub fn refresh(
    db: &mut Database,
    config: &Config,
    settings: &ScheduleConfig,
    now: DateTime<Utc>,
) -> Result<Schedule> {
    let events: Vec<RawEvent> = db
        .list_events(Some(&config.calendar))
        .context("failed to load events")?
        .into_iter()
        .map(|record| record.event)
        .collect();
    let schedule = ct_core::resolve(&events, now, settings);
    db.save(&schedule).context("failed to save schedule")?;
    Ok(schedule)
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    settings: &ScheduleConfig,
    now: DateTime<Utc>,
) -> Result<()> {
    let schedule = refresh(db, config, settings, now)?;
    let window = buckets(
        schedule.window_start(),
        settings.granularity,
        settings.lookahead_minutes,
    )
    .len();
    writeln!(
        writer,
        "Resolved {} of {} buckets from {} ({} every {})",
        schedule.len(),
        window,
        format_instant(schedule.window_start()),
        config.calendar,
        settings.granularity,
    )?;
    Ok(())
}
