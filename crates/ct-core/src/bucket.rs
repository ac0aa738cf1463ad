//! Time bucketing.
//!
//! A bucket is one instant at which the target schedule is sampled. The first
//! bucket is the floored current time; each following bucket is one
//! granularity later, up to (but excluding) the end of the lookahead window.

use std::fmt;
use std::iter::FusedIterator;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Spacing between consecutive buckets, in whole minutes.
///
/// Always at least one minute; zero and negative values are rejected at
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Granularity(u32);

impl Granularity {
    /// Quarter-hour buckets.
    pub const DEFAULT: Self = Self(15);

    /// Creates a granularity after validation.
    pub fn from_minutes(minutes: i64) -> Result<Self, ConfigError> {
        u32::try_from(minutes)
            .ok()
            .filter(|&m| m >= 1)
            .map(Self)
            .ok_or(ConfigError::InvalidGranularity(minutes))
    }

    /// Returns the granularity in minutes.
    pub const fn minutes(self) -> u32 {
        self.0
    }

    /// Returns the granularity as a duration.
    pub fn duration(self) -> Duration {
        Duration::minutes(i64::from(self.0))
    }
}

impl TryFrom<i64> for Granularity {
    type Error = ConfigError;

    fn try_from(minutes: i64) -> Result<Self, Self::Error> {
        Self::from_minutes(minutes)
    }
}

impl From<Granularity> for i64 {
    fn from(granularity: Granularity) -> Self {
        Self::from(granularity.0)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

/// Floors an instant to its bucket.
///
/// Seconds and sub-second components are zeroed, and the minute-of-hour is
/// rounded down to the nearest multiple of `granularity`. Flooring is
/// relative to the hour, so a 7 minute granularity floors minute 59 to 56.
pub fn floor(now: DateTime<Utc>, granularity: Granularity) -> DateTime<Utc> {
    let excess_minutes = now.minute() % granularity.minutes();
    now - Duration::minutes(i64::from(excess_minutes))
        - Duration::seconds(i64::from(now.second()))
        - Duration::nanoseconds(i64::from(now.nanosecond()))
}

/// Returns the buckets covering `[floored, floored + lookahead)`.
///
/// `floored` should already be the output of [`floor`]. When the lookahead
/// is shorter than one granularity the sequence is empty; otherwise it holds
/// `ceil(lookahead / granularity)` buckets.
pub fn buckets(floored: DateTime<Utc>, granularity: Granularity, lookahead_minutes: u32) -> Buckets {
    let step = granularity.minutes();
    let count = if lookahead_minutes < step {
        0
    } else {
        lookahead_minutes.div_ceil(step)
    };
    Buckets {
        next: floored,
        step: granularity.duration(),
        remaining: usize::try_from(count).unwrap_or(usize::MAX),
    }
}

/// Lazy, finite iterator over bucket instants. See [`buckets`].
#[derive(Debug, Clone)]
pub struct Buckets {
    next: DateTime<Utc>,
    step: Duration,
    remaining: usize,
}

impl Iterator for Buckets {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let bucket = self.next;
        match bucket.checked_add_signed(self.step) {
            Some(next) => {
                self.next = next;
                self.remaining -= 1;
            }
            // End of representable time.
            None => self.remaining = 0,
        }
        Some(bucket)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Buckets {}

impl FusedIterator for Buckets {}
