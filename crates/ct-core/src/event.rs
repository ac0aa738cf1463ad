//! Calendar events and their normalization.
//!
//! A [`RawEvent`] is what a calendar export hands us: a free-text label, a
//! start and end that are either precise instants or bare dates, and the
//! instant the event was created. Normalization keeps only events whose label
//! is an integer and whose bounds form a non-empty `[start, end)` interval.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A calendar event as supplied by the caller.
///
/// Each bound is either a precise instant or a date for all-day events. When
/// both are present the instant wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event title. Only integer labels take part in resolution.
    #[serde(default)]
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,

    #[serde(default, alias = "startDate", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,

    #[serde(default, alias = "endDate", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// When the event was authored. Only used to break ties.
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// An event ready for resolution.
///
/// Invariant: `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Event {
    pub value: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Returns true if `instant` falls in `[start, end)`.
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Converts an all-day date to the instant it begins.
///
/// All-day bounds map to midnight at the start of `date` in `zone`. When that
/// midnight falls inside a daylight-saving gap, the first valid instant after
/// the gap is used instead.
pub fn date_to_instant(date: NaiveDate, zone: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    if let Some(start) = zone.from_local_datetime(&midnight).earliest() {
        return start.with_timezone(&Utc);
    }
    (1..=24 * 60)
        .find_map(|minutes| {
            zone.from_local_datetime(&(midnight + Duration::minutes(minutes)))
                .earliest()
        })
        .map_or_else(|| midnight.and_utc(), |start| start.with_timezone(&Utc))
}

/// Normalizes one raw event.
///
/// Returns `None` when the label is not a base-10 integer, when either bound
/// is missing, or when the interval is empty. None of these are errors: such
/// events simply do not set a target.
pub fn normalize(raw: &RawEvent, all_day_zone: &Tz) -> Option<Event> {
    let Ok(value) = raw.label.parse::<i32>() else {
        tracing::trace!(label = %raw.label, "skipping event with non-integer label");
        return None;
    };
    let start = bound(raw.start, raw.start_date, all_day_zone)?;
    let end = bound(raw.end, raw.end_date, all_day_zone)?;
    if start >= end {
        tracing::debug!(%start, %end, value, "skipping event with empty interval");
        return None;
    }
    Some(Event {
        value,
        start,
        end,
        created_at: raw.created_at,
    })
}

/// Normalizes a batch of raw events, dropping ineligible ones.
pub fn normalize_events(raw_events: &[RawEvent], all_day_zone: &Tz) -> Vec<Event> {
    let events: Vec<Event> = raw_events
        .iter()
        .filter_map(|raw| normalize(raw, all_day_zone))
        .collect();
    tracing::debug!(
        eligible = events.len(),
        dropped = raw_events.len() - events.len(),
        "normalized calendar events"
    );
    events
}

fn bound(instant: Option<DateTime<Utc>>, date: Option<NaiveDate>, zone: &Tz) -> Option<DateTime<Utc>> {
    instant.or_else(|| date.map(|d| date_to_instant(d, zone)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, hour, minute, 0)
            .single()
            .expect("valid test timestamp")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn timed(label: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> RawEvent {
        RawEvent {
            label: label.to_string(),
            start: Some(start),
            start_date: None,
            end: Some(end),
            end_date: None,
            created_at: ts(0, 0),
        }
    }

    fn all_day(label: &str, start: NaiveDate, end: NaiveDate) -> RawEvent {
        RawEvent {
            label: label.to_string(),
            start: None,
            start_date: Some(start),
            end: None,
            end_date: Some(end),
            created_at: ts(0, 0),
        }
    }

    #[test]
    fn normalize_parses_integer_label() {
        let event = normalize(&timed("21", ts(9, 0), ts(10, 0)), &Tz::UTC).unwrap();
        assert_eq!(event.value, 21);
        assert_eq!(event.start, ts(9, 0));
        assert_eq!(event.end, ts(10, 0));
        assert_eq!(event.created_at, ts(0, 0));
    }

    #[test]
    fn normalize_accepts_signed_labels() {
        let zone = Tz::UTC;
        assert_eq!(normalize(&timed("-4", ts(9, 0), ts(10, 0)), &zone).map(|e| e.value), Some(-4));
        assert_eq!(normalize(&timed("+18", ts(9, 0), ts(10, 0)), &zone).map(|e| e.value), Some(18));
    }

    #[test]
    fn normalize_drops_non_integer_labels() {
        let zone = Tz::UTC;
        for label in ["warm", "", "20.5", " 20", "20 ", "99999999999"] {
            assert!(
                normalize(&timed(label, ts(9, 0), ts(10, 0)), &zone).is_none(),
                "label {label:?} should be dropped"
            );
        }
    }

    #[test]
    fn normalize_drops_empty_and_inverted_intervals() {
        let zone = Tz::UTC;
        assert!(normalize(&timed("20", ts(9, 0), ts(9, 0)), &zone).is_none());
        assert!(normalize(&timed("20", ts(10, 0), ts(9, 0)), &zone).is_none());
    }

    #[test]
    fn normalize_drops_events_without_bounds() {
        let mut raw = timed("20", ts(9, 0), ts(10, 0));
        raw.end = None;
        assert!(normalize(&raw, &Tz::UTC).is_none());
    }

    #[test]
    fn normalize_prefers_instant_over_date() {
        let mut raw = timed("20", ts(9, 0), ts(10, 0));
        raw.start_date = Some(date(2025, 1, 1));
        raw.end_date = Some(date(2025, 2, 1));
        let event = normalize(&raw, &Tz::UTC).unwrap();
        assert_eq!(event.start, ts(9, 0));
        assert_eq!(event.end, ts(10, 0));
    }

    #[test]
    fn all_day_event_spans_utc_midnights_by_default() {
        let raw = all_day("19", date(2025, 1, 15), date(2025, 1, 16));
        let event = normalize(&raw, &Tz::UTC).unwrap();
        assert_eq!(event.start, ts(0, 0));
        assert_eq!(event.end, ts(0, 0) + Duration::days(1));
    }

    #[test]
    fn mixed_timed_start_and_all_day_end() {
        let raw = RawEvent {
            end: None,
            end_date: Some(date(2025, 1, 16)),
            ..timed("19", ts(18, 0), ts(18, 0))
        };
        let event = normalize(&raw, &Tz::UTC).unwrap();
        assert_eq!(event.start, ts(18, 0));
        assert_eq!(event.end, ts(0, 0) + Duration::days(1));
    }

    #[test]
    fn date_to_instant_uses_local_midnight() {
        let new_york = Tz::America__New_York;
        // EST in winter, EDT in summer.
        assert_eq!(
            date_to_instant(date(2025, 1, 15), &new_york),
            Utc.with_ymd_and_hms(2025, 1, 15, 5, 0, 0).unwrap()
        );
        assert_eq!(
            date_to_instant(date(2025, 7, 4), &new_york),
            Utc.with_ymd_and_hms(2025, 7, 4, 4, 0, 0).unwrap()
        );
    }

    #[test]
    fn date_to_instant_skips_midnight_dst_gap() {
        // Brazil moved clocks from 00:00 to 01:00 on 2018-11-04.
        let sao_paulo = Tz::America__Sao_Paulo;
        assert_eq!(
            date_to_instant(date(2018, 11, 4), &sao_paulo),
            Utc.with_ymd_and_hms(2018, 11, 4, 3, 0, 0).unwrap()
        );
    }

    #[test]
    fn raw_event_deserializes_camel_case_dates() {
        let json = r#"{
            "label": "17",
            "startDate": "2025-01-15",
            "endDate": "2025-01-16",
            "createdAt": "2025-01-01T08:00:00+01:00"
        }"#;
        let raw: RawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(raw.start_date, Some(date(2025, 1, 15)));
        assert_eq!(raw.end_date, Some(date(2025, 1, 16)));
        assert_eq!(
            raw.created_at,
            Utc.with_ymd_and_hms(2025, 1, 1, 7, 0, 0).unwrap()
        );
        assert!(raw.start.is_none());
    }

    #[test]
    fn normalize_events_keeps_only_eligible() {
        let raws = vec![
            timed("20", ts(9, 0), ts(10, 0)),
            timed("warm", ts(9, 0), ts(10, 0)),
            timed("18", ts(11, 0), ts(10, 0)),
            all_day("16", date(2025, 1, 15), date(2025, 1, 16)),
        ];
        let values: Vec<i32> = normalize_events(&raws, &Tz::UTC)
            .iter()
            .map(|e| e.value)
            .collect();
        assert_eq!(values, vec![20, 16]);
    }

    #[test]
    fn covers_is_half_open() {
        let event = normalize(&timed("20", ts(9, 0), ts(9, 30)), &Tz::UTC).unwrap();
        assert!(event.covers(ts(9, 0)));
        assert!(event.covers(ts(9, 15)));
        assert!(!event.covers(ts(9, 30)));
        assert!(!event.covers(ts(8, 59)));
    }
}
