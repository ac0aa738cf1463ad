//! Interval resolution.
//!
//! Turns a list of events into a [`Schedule`] by sampling every bucket of the
//! lookahead window.
//!
//! # Algorithm Summary
//!
//! 1. Floor `now` to its bucket and generate the window's buckets
//! 2. Sort events by start so each bucket only scans events that began by then
//! 3. For each bucket, collect events whose `[start, end)` contains it
//! 4. Pick one winner per bucket using the configured [`TieBreak`]
//!
//! Buckets are independent of each other, so step 3-4 runs in parallel and
//! the results are merged back in bucket order.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::bucket::{buckets, floor};
use crate::config::{ScheduleConfig, TieBreak};
use crate::event::{Event, RawEvent, normalize_events};
use crate::schedule::Schedule;

/// Resolves raw calendar events into a schedule.
///
/// Events with non-integer labels or unusable bounds are dropped first (see
/// [`crate::normalize`]). An empty schedule is a valid result and means no
/// event governs any bucket in the window.
pub fn resolve(raw_events: &[RawEvent], now: DateTime<Utc>, config: &ScheduleConfig) -> Schedule {
    let events = normalize_events(raw_events, &config.all_day_zone);
    resolve_normalized(&events, now, config)
}

/// Resolves already-normalized events into a schedule.
pub fn resolve_normalized(events: &[Event], now: DateTime<Utc>, config: &ScheduleConfig) -> Schedule {
    let window_start = floor(now, config.granularity);
    let window: Vec<DateTime<Utc>> =
        buckets(window_start, config.granularity, config.lookahead_minutes).collect();

    let mut by_start: Vec<&Event> = events.iter().collect();
    by_start.sort_by_key(|event| event.start);

    let entries: Vec<(DateTime<Utc>, i32)> = window
        .par_iter()
        .filter_map(|&bucket| {
            winner(&by_start, bucket, config.tie_break).map(|event| (bucket, event.value))
        })
        .collect();

    tracing::debug!(
        %window_start,
        buckets = window.len(),
        events = events.len(),
        targets = entries.len(),
        "resolved target schedule"
    );

    Schedule::from_entries(config.granularity, window_start, entries)
}

/// Picks the event governing `bucket`, if any.
///
/// `by_start` must be sorted by start ascending.
fn winner<'a>(by_start: &[&'a Event], bucket: DateTime<Utc>, tie_break: TieBreak) -> Option<&'a Event> {
    let started = by_start.partition_point(|event| event.start <= bucket);
    by_start[..started]
        .iter()
        .copied()
        .filter(|event| event.covers(bucket))
        .min_by(|a, b| precedence(a, b, tie_break))
}

/// Orders events so that the winner compares least.
///
/// Equal creation times fall back to `(start, end, value)`, which makes the
/// winner independent of input order.
fn precedence(a: &Event, b: &Event, tie_break: TieBreak) -> Ordering {
    let by_created = match tie_break {
        TieBreak::EarliestCreated => a.created_at.cmp(&b.created_at),
        TieBreak::LatestCreated => b.created_at.cmp(&a.created_at),
    };
    by_created
        .then_with(|| a.start.cmp(&b.start))
        .then_with(|| a.end.cmp(&b.end))
        .then_with(|| a.value.cmp(&b.value))
}
