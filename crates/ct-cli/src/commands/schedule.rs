//! Schedule command for printing the stored schedule.

use std::io::Write;

use anyhow::{Context, Result};

use ct_db::Database;

use super::util::format_instant;

pub fn run<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let schedule = db.load_schedule().context("failed to load schedule")?;

    if json {
        serde_json::to_writer_pretty(&mut *writer, &schedule)
            .context("failed to encode schedule")?;
        writeln!(writer)?;
        return Ok(());
    }

    let Some(schedule) = schedule else {
        writeln!(writer, "No schedule stored.")?;
        return Ok(());
    };

    writeln!(
        writer,
        "Schedule from {} every {}:",
        format_instant(schedule.window_start()),
        schedule.granularity()
    )?;
    for (bucket, value) in schedule.iter() {
        writeln!(writer, "{}  {value}", format_instant(bucket))?;
    }
    Ok(())
}
