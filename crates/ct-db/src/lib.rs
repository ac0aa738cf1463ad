//! Storage layer for calendar targets.
//!
//! Provides persistence for imported calendar events and for the most recent
//! resolved [`Schedule`] using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. Readers that need to look
//! up targets concurrently with a resolution pass should load the schedule once
//! and publish it through [`ct_core::MemoryScheduleStore`].
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Instants are stored as TEXT in RFC 3339 format, always UTC with a `Z`
//! suffix (e.g., `2025-01-15T09:00:00Z`). Fractional seconds are written only
//! when present, so creation times keep their full precision. All-day bounds
//! are stored as plain dates (`2025-01-15`) in their own columns.
//!
//! ## Schedule Storage
//!
//! Exactly one schedule is stored at a time. `schedule_meta` holds a single
//! row describing it and `schedule_targets` holds one row per bucket. Saving a
//! schedule replaces both inside one transaction; saving an empty schedule
//! leaves both empty.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use ct_core::{ConfigError, Granularity, RawEvent, Schedule, ScheduleStore};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored instant or date could not be parsed.
    #[error("invalid {column} value: {value}")]
    TimestampParse {
        column: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// The stored schedule granularity is not a valid granularity.
    #[error("invalid stored granularity")]
    InvalidGranularity(#[from] ConfigError),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A calendar event as stored in the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub id: String,
    /// Name of the calendar the event was imported from.
    pub calendar: String,
    pub event: RawEvent,
}

/// Event count and most recent creation time for one calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSummary {
    pub calendar: String,
    pub events: usize,
    pub last_created: DateTime<Utc>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Events table: calendar entries imported from exports
            -- start_at/end_at: precise instants; start_date/end_date: all-day dates
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                calendar TEXT NOT NULL,
                label TEXT NOT NULL,
                start_at TEXT,
                start_date TEXT,
                end_at TEXT,
                end_date TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_calendar ON events(calendar);

            CREATE TABLE IF NOT EXISTS schedule_meta (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                granularity_minutes INTEGER NOT NULL,
                window_start TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS schedule_targets (
                bucket TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of events, ignoring duplicates by ID.
    pub fn insert_events(&mut self, events: &[EventRecord]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO events
                (id, calendar, label, start_at, start_date, end_at, end_date, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            for record in events {
                let event = &record.event;
                inserted += stmt.execute(params![
                    record.id,
                    record.calendar,
                    event.label,
                    event.start.map(format_timestamp),
                    event.start_date.map(format_date),
                    event.end.map(format_timestamp),
                    event.end_date.map(format_date),
                    format_timestamp(event.created_at),
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Lists events, optionally limited to one calendar, ordered by ID.
    pub fn list_events(&self, calendar: Option<&str>) -> Result<Vec<EventRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, calendar, label, start_at, start_date, end_at, end_date, created_at
            FROM events
            WHERE ?1 IS NULL OR calendar = ?1
            ORDER BY id ASC
            ",
        )?;
        let rows = stmt.query_map([calendar], |row| {
            Ok(EventRow {
                id: row.get(0)?,
                calendar: row.get(1)?,
                label: row.get(2)?,
                start_at: row.get(3)?,
                start_date: row.get(4)?,
                end_at: row.get(5)?,
                end_date: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_record()?);
        }
        Ok(events)
    }

    /// Counts events per calendar, ordered by calendar name.
    pub fn calendar_summaries(&self) -> Result<Vec<CalendarSummary>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT calendar, created_at
            FROM events
            ORDER BY calendar ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut summaries: Vec<CalendarSummary> = Vec::new();
        for row in rows {
            let (calendar, created_at) = row?;
            // Fractional seconds vary in width, so MAX() on the text is not reliable.
            let created_at = parse_timestamp(&created_at, "created_at")?;
            match summaries.last_mut() {
                Some(summary) if summary.calendar == calendar => {
                    summary.events += 1;
                    summary.last_created = summary.last_created.max(created_at);
                }
                _ => summaries.push(CalendarSummary {
                    calendar,
                    events: 1,
                    last_created: created_at,
                }),
            }
        }
        Ok(summaries)
    }

    /// Replaces the stored schedule.
    pub fn save_schedule(&mut self, schedule: &Schedule) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM schedule_targets", [])?;
        tx.execute("DELETE FROM schedule_meta", [])?;
        if !schedule.is_empty() {
            tx.execute(
                "INSERT INTO schedule_meta (id, granularity_minutes, window_start) VALUES (1, ?, ?)",
                params![
                    i64::from(schedule.granularity()),
                    format_timestamp(schedule.window_start())
                ],
            )?;
            let mut stmt =
                tx.prepare("INSERT INTO schedule_targets (bucket, value) VALUES (?, ?)")?;
            for (bucket, value) in schedule.iter() {
                stmt.execute(params![format_timestamp(bucket), value])?;
            }
        }
        tx.commit()?;
        tracing::info!(
            targets = schedule.len(),
            window_start = %schedule.window_start(),
            "saved target schedule"
        );
        Ok(())
    }

    /// Removes the stored schedule so the next lookup has to resolve again.
    pub fn clear_schedule(&mut self) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM schedule_targets", [])?;
        tx.execute("DELETE FROM schedule_meta", [])?;
        tx.commit()?;
        tracing::debug!("cleared stored schedule");
        Ok(())
    }

    /// Loads the stored schedule, if one exists.
    pub fn load_schedule(&self) -> Result<Option<Schedule>, DbError> {
        let meta = self
            .conn
            .query_row(
                "SELECT granularity_minutes, window_start FROM schedule_meta WHERE id = 1",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((granularity_minutes, window_start)) = meta else {
            return Ok(None);
        };
        let granularity = Granularity::from_minutes(granularity_minutes)?;
        let window_start = parse_timestamp(&window_start, "window_start")?;

        let mut stmt = self
            .conn
            .prepare("SELECT bucket, value FROM schedule_targets ORDER BY bucket ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i32>(1)?))
        })?;
        let mut targets = Vec::new();
        for row in rows {
            let (bucket, value) = row?;
            targets.push((parse_timestamp(&bucket, "bucket")?, value));
        }
        Ok(Some(Schedule::from_entries(granularity, window_start, targets)))
    }
}

impl ScheduleStore for Database {
    type Error = DbError;

    fn save(&mut self, schedule: &Schedule) -> Result<(), Self::Error> {
        self.save_schedule(schedule)
    }

    fn load(&self) -> Result<Option<Schedule>, Self::Error> {
        self.load_schedule()
    }
}

/// Raw column values of an `events` row.
struct EventRow {
    id: String,
    calendar: String,
    label: String,
    start_at: Option<String>,
    start_date: Option<String>,
    end_at: Option<String>,
    end_date: Option<String>,
    created_at: String,
}

impl EventRow {
    fn into_record(self) -> Result<EventRecord, DbError> {
        Ok(EventRecord {
            id: self.id,
            calendar: self.calendar,
            event: RawEvent {
                label: self.label,
                start: parse_optional(self.start_at.as_deref(), "start_at", parse_timestamp)?,
                start_date: parse_optional(self.start_date.as_deref(), "start_date", parse_date)?,
                end: parse_optional(self.end_at.as_deref(), "end_at", parse_timestamp)?,
                end_date: parse_optional(self.end_date.as_deref(), "end_date", parse_date)?,
                created_at: parse_timestamp(&self.created_at, "created_at")?,
            },
        })
    }
}

fn parse_optional<T>(
    value: Option<&str>,
    column: &'static str,
    parse: fn(&str, &'static str) -> Result<T, DbError>,
) -> Result<Option<T>, DbError> {
    value.map(|v| parse(v, column)).transpose()
}

fn parse_timestamp(value: &str, column: &'static str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            column,
            value: value.to_string(),
            source,
        })
}

fn parse_date(value: &str, column: &'static str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| DbError::TimestampParse {
        column,
        value: value.to_string(),
        source,
    })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
