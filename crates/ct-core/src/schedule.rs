//! Resolved target schedules.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bucket::{Granularity, floor};

/// Ordered mapping from bucket instant to target value.
///
/// Buckets without a governing event are absent rather than mapped to a
/// default. A schedule remembers the granularity it was built with so it can
/// be looked up with the same floor rule later, even after a round trip
/// through a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    granularity: Granularity,
    window_start: DateTime<Utc>,
    targets: BTreeMap<DateTime<Utc>, i32>,
}

impl Schedule {
    /// Creates an empty schedule for a window starting at `window_start`.
    pub const fn new(granularity: Granularity, window_start: DateTime<Utc>) -> Self {
        Self {
            granularity,
            window_start,
            targets: BTreeMap::new(),
        }
    }

    /// Builds a schedule from `(bucket, value)` pairs.
    ///
    /// A bucket given more than once keeps its last value.
    pub fn from_entries(
        granularity: Granularity,
        window_start: DateTime<Utc>,
        entries: impl IntoIterator<Item = (DateTime<Utc>, i32)>,
    ) -> Self {
        Self {
            granularity,
            window_start,
            targets: entries.into_iter().collect(),
        }
    }

    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// The floored instant the schedule was resolved at.
    pub const fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Returns the target for an exact bucket instant.
    pub fn get(&self, bucket: DateTime<Utc>) -> Option<i32> {
        self.targets.get(&bucket).copied()
    }

    /// Iterates `(bucket, value)` pairs in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, i32)> + '_ {
        self.targets.iter().map(|(bucket, value)| (*bucket, *value))
    }

    /// The last bucket with a target, if any.
    pub fn last_bucket(&self) -> Option<DateTime<Utc>> {
        self.targets.keys().next_back().copied()
    }

    /// Looks up the target for `now` using this schedule's own granularity.
    pub fn lookup_now(&self, now: DateTime<Utc>) -> Option<i32> {
        lookup(self, now, self.granularity)
    }
}

/// Returns the target governing `now`.
///
/// `now` is floored by `granularity` and looked up exactly. `None` means no
/// target is available: either no event covered that bucket or the schedule
/// does not reach `now`. Substituting a default is left to the caller.
pub fn lookup(schedule: &Schedule, now: DateTime<Utc>, granularity: Granularity) -> Option<i32> {
    schedule.get(floor(now, granularity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0)
            .single()
            .expect("valid test timestamp")
            + Duration::minutes(minutes)
    }

    fn quarter_hour() -> Granularity {
        Granularity::from_minutes(15).unwrap()
    }

    fn sample() -> Schedule {
        Schedule::from_entries(quarter_hour(), ts(0), [(ts(15), 21), (ts(0), 19), (ts(30), 21)])
    }

    #[test]
    fn iterates_in_bucket_order() {
        let buckets: Vec<i64> = sample()
            .iter()
            .map(|(bucket, _)| (bucket - ts(0)).num_minutes())
            .collect();
        assert_eq!(buckets, vec![0, 15, 30]);
        assert_eq!(sample().last_bucket(), Some(ts(30)));
    }

    #[test]
    fn lookup_floors_now() {
        let schedule = sample();
        assert_eq!(lookup(&schedule, ts(0), quarter_hour()), Some(19));
        assert_eq!(
            lookup(&schedule, ts(14) + Duration::seconds(59), quarter_hour()),
            Some(19)
        );
        assert_eq!(lookup(&schedule, ts(16), quarter_hour()), Some(21));
    }

    #[test]
    fn lookup_misses_outside_schedule() {
        let schedule = sample();
        assert_eq!(lookup(&schedule, ts(45), quarter_hour()), None);
        assert_eq!(lookup(&schedule, ts(-1), quarter_hour()), None);
    }

    #[test]
    fn lookup_misses_on_gap() {
        let schedule = Schedule::from_entries(quarter_hour(), ts(0), [(ts(0), 19), (ts(30), 21)]);
        assert_eq!(schedule.lookup_now(ts(20)), None);
        assert_eq!(schedule.lookup_now(ts(31)), Some(21));
    }

    #[test]
    fn lookup_on_empty_schedule_misses() {
        let schedule = Schedule::new(quarter_hour(), ts(0));
        assert!(schedule.is_empty());
        assert_eq!(schedule.lookup_now(ts(0)), None);
    }

    #[test]
    fn serializes_bucket_keys_as_timestamps() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["granularity"], 15);
        assert_eq!(json["targets"]["2025-01-15T09:15:00Z"], 21);

        let parsed: Schedule = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, sample());
    }
}
