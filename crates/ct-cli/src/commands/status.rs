//! Status command for showing imported calendars and the stored schedule.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};

use ct_db::Database;

use super::util::format_instant;
use crate::Config;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<()> {
    writeln!(writer, "Calendar target status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Calendar: {}", config.calendar)?;

    let calendars = db.calendar_summaries()?;
    if calendars.is_empty() {
        writeln!(writer, "No events imported.")?;
    } else {
        writeln!(writer, "Events:")?;
        for calendar in calendars {
            writeln!(
                writer,
                "- {}: {} (last created {})",
                calendar.calendar,
                calendar.events,
                format_instant(calendar.last_created)
            )?;
        }
    }

    let Some(schedule) = db.load_schedule()? else {
        writeln!(writer, "Schedule: none")?;
        return Ok(());
    };
    let last = schedule.last_bucket().unwrap_or_else(|| schedule.window_start());
    writeln!(
        writer,
        "Schedule: {} targets from {} to {} every {}",
        schedule.len(),
        format_instant(schedule.window_start()),
        format_instant(last),
        schedule.granularity()
    )?;
    match schedule.lookup_now(now) {
        Some(value) => writeln!(writer, "Current target: {value}")?,
        None => writeln!(
            writer,
            "Current target: none (default {})",
            config.default_target
        )?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};
    use ct_core::{RawEvent, ScheduleStore};
    use ct_db::EventRecord;
    use insta::assert_snapshot;

    fn ts(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn event(id: &str, calendar: &str, label: &str, created: i64) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            calendar: calendar.to_string(),
            event: RawEvent {
                label: label.to_string(),
                start: Some(ts(0)),
                start_date: None,
                end: Some(ts(45)),
                end_date: None,
                created_at: ts(created),
            },
        }
    }

    fn render(db: &Database, config: &Config, now: DateTime<Utc>) -> String {
        let mut output = Vec::new();
        run(&mut output, db, config, now).unwrap();
        let output = String::from_utf8(output).unwrap();
        output.replace(&config.database_path.display().to_string(), "[TEMP]/ct.db")
    }

    #[test]
    fn status_command_outputs_calendars_and_schedule() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("ct.db"),
            ..Config::default()
        };
        let mut db = Database::open(&config.database_path).unwrap();
        db.insert_events(&[
            event("a", "Thermostat", "20", -300),
            event("b", "Thermostat", "Dentist", -200),
            event("c", "Holidays", "21", -100),
        ])
        .unwrap();
        let settings = config.schedule_config().unwrap();
        let schedule = ct_core::resolve(
            &db.list_events(Some("Thermostat"))
                .unwrap()
                .into_iter()
                .map(|record| record.event)
                .collect::<Vec<_>>(),
            ts(0),
            &settings,
        );
        db.save(&schedule).unwrap();

        assert_snapshot!(render(&db, &config, ts(20)).trim_end(), @r"
        Calendar target status
        Database: [TEMP]/ct.db
        Calendar: Thermostat
        Events:
        - Holidays: 1 (last created 2025-01-15T07:20:00Z)
        - Thermostat: 2 (last created 2025-01-15T05:40:00Z)
        Schedule: 3 targets from 2025-01-15T09:00:00Z to 2025-01-15T09:30:00Z every 15m
        Current target: 20
        ");

        let later = render(&db, &config, ts(50));
        assert!(later.ends_with("Current target: none (default 0)\n"));
    }

    #[test]
    fn status_command_on_empty_database() {
        let db = Database::open_in_memory().unwrap();
        let config = Config {
            database_path: "/tmp/ct-status/ct.db".into(),
            ..Config::default()
        };
        assert_snapshot!(render(&db, &config, ts(0)).trim_end(), @r"
        Calendar target status
        Database: [TEMP]/ct.db
        Calendar: Thermostat
        No events imported.
        Schedule: none
        ");
    }
}
