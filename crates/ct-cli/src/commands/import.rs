//! Import command for loading calendar events into the local `SQLite` store.

use std::io::BufRead;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use uuid::Uuid;

use ct_core::RawEvent;
use ct_db::{Database, EventRecord};

use crate::Config;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Calendar to file events under when a line omits `calendar`.
    ///
    /// Defaults to the configured calendar.
    #[arg(long)]
    pub calendar: Option<String>,
}

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub read: usize,
    pub inserted: usize,
}

pub fn run<R: BufRead>(
    reader: R,
    db: &mut Database,
    args: &ImportArgs,
    config: &Config,
) -> Result<ImportSummary> {
    let calendar = args.calendar.as_deref().unwrap_or(&config.calendar);
    let events = parse_events(reader, calendar)?;
    let inserted = db
        .insert_events(&events)
        .context("failed to store imported events")?;
    if inserted > 0 {
        // The stored schedule was built without these events.
        db.clear_schedule()
            .context("failed to invalidate stored schedule")?;
    }
    tracing::debug!(read = events.len(), inserted, "imported events");
    Ok(ImportSummary {
        read: events.len(),
        inserted,
    })
}

fn parse_events<R: BufRead>(reader: R, default_calendar: &str) -> Result<Vec<EventRecord>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let meta: ImportMeta = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid event on line {}", idx + 1))?;
        let event: RawEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid event on line {}", idx + 1))?;
        events.push(meta.into_record(event, default_calendar));
    }
    Ok(events)
}

/// Bookkeeping fields that may accompany a [`RawEvent`] on an import line.
#[derive(Debug, Deserialize)]
struct ImportMeta {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    calendar: Option<String>,
}

impl ImportMeta {
    fn into_record(self, event: RawEvent, default_calendar: &str) -> EventRecord {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let calendar = self
            .calendar
            .filter(|calendar| !calendar.trim().is_empty())
            .unwrap_or_else(|| default_calendar.to_string());
        EventRecord {
            id,
            calendar,
            event,
        }
    }
}
