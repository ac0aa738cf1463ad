//! Resolution configuration.
//!
//! A [`ScheduleConfig`] is validated once, when it is built, and then passed
//! by reference into every resolution pass.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bucket::Granularity;

/// Longest accepted lookahead: one leap year.
pub const MAX_LOOKAHEAD_MINUTES: u32 = 366 * 24 * 60;

/// Invalid resolution parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Granularity was zero, negative, or too large.
    #[error("granularity must be a positive number of minutes, got {0}")]
    InvalidGranularity(i64),

    /// Lookahead was negative or longer than [`MAX_LOOKAHEAD_MINUTES`].
    #[error("lookahead must be between 0 and {max} minutes, got {0}", max = MAX_LOOKAHEAD_MINUTES)]
    InvalidLookahead(i64),

    /// The all-day time zone is not a known IANA identifier.
    #[error("unknown time zone: {0}")]
    InvalidTimeZone(String),

    /// The tie-break policy name is not recognized.
    #[error("unknown tie-break policy: {0}")]
    InvalidTieBreak(String),
}

/// Which event wins when several cover the same bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The event created first wins; later edits do not override it.
    #[default]
    EarliestCreated,
    /// The most recently created event wins.
    LatestCreated,
}

impl TieBreak {
    /// String representation used in configuration files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EarliestCreated => "earliest_created",
            Self::LatestCreated => "latest_created",
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TieBreak {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earliest_created" => Ok(Self::EarliestCreated),
            "latest_created" => Ok(Self::LatestCreated),
            _ => Err(ConfigError::InvalidTieBreak(s.to_string())),
        }
    }
}

/// Parameters of a resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Spacing between buckets.
    pub granularity: Granularity,

    /// Width of the resolved window, in minutes.
    pub lookahead_minutes: u32,

    /// Conflict policy for overlapping events.
    pub tie_break: TieBreak,

    /// Zone whose midnight a date-only event bound maps to.
    pub all_day_zone: Tz,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::DEFAULT,
            lookahead_minutes: 180,
            tie_break: TieBreak::default(),
            all_day_zone: Tz::UTC,
        }
    }
}

impl ScheduleConfig {
    /// Validates granularity and lookahead, keeping the default policy and zone.
    pub fn new(granularity_minutes: i64, lookahead_minutes: i64) -> Result<Self, ConfigError> {
        let granularity = Granularity::from_minutes(granularity_minutes)?;
        let lookahead_minutes = u32::try_from(lookahead_minutes)
            .ok()
            .filter(|&minutes| minutes <= MAX_LOOKAHEAD_MINUTES)
            .ok_or(ConfigError::InvalidLookahead(lookahead_minutes))?;
        Ok(Self {
            granularity,
            lookahead_minutes,
            ..Self::default()
        })
    }

    #[must_use]
    pub const fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    #[must_use]
    pub const fn with_all_day_zone(mut self, zone: Tz) -> Self {
        self.all_day_zone = zone;
        self
    }

    /// Returns the lookahead as a duration.
    pub fn lookahead(&self) -> Duration {
        Duration::minutes(i64::from(self.lookahead_minutes))
    }
}

/// Parses an IANA time zone name such as `Europe/Berlin`.
pub fn parse_time_zone(name: &str) -> Result<Tz, ConfigError> {
    name.parse()
        .map_err(|_| ConfigError::InvalidTimeZone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_granularity() {
        assert_eq!(
            ScheduleConfig::new(0, 180),
            Err(ConfigError::InvalidGranularity(0))
        );
        assert_eq!(
            ScheduleConfig::new(-5, 180),
            Err(ConfigError::InvalidGranularity(-5))
        );
    }

    #[test]
    fn new_validates_lookahead() {
        assert_eq!(
            ScheduleConfig::new(15, -1),
            Err(ConfigError::InvalidLookahead(-1))
        );
        let config = ScheduleConfig::new(15, 0).unwrap();
        assert_eq!(config.lookahead_minutes, 0);

        let year = i64::from(MAX_LOOKAHEAD_MINUTES);
        assert!(ScheduleConfig::new(1, year).is_ok());
        assert_eq!(
            ScheduleConfig::new(1, year + 1),
            Err(ConfigError::InvalidLookahead(year + 1))
        );
        assert_eq!(
            ScheduleConfig::new(1, i64::from(u32::MAX)),
            Err(ConfigError::InvalidLookahead(i64::from(u32::MAX)))
        );
        assert_eq!(
            ConfigError::InvalidLookahead(-1).to_string(),
            "lookahead must be between 0 and 527040 minutes, got -1"
        );
    }

    #[test]
    fn new_keeps_default_policy_and_zone() {
        let config = ScheduleConfig::new(30, 240).unwrap();
        assert_eq!(config.granularity.minutes(), 30);
        assert_eq!(config.lookahead(), Duration::hours(4));
        assert_eq!(config.tie_break, TieBreak::EarliestCreated);
        assert_eq!(config.all_day_zone, Tz::UTC);
    }

    #[test]
    fn default_matches_quarter_hour_three_hour_window() {
        let config = ScheduleConfig::default();
        assert_eq!(config.granularity.minutes(), 15);
        assert_eq!(config.lookahead_minutes, 180);
    }

    #[test]
    fn tie_break_roundtrips_through_strings() {
        for policy in [TieBreak::EarliestCreated, TieBreak::LatestCreated] {
            let parsed: TieBreak = policy.to_string().parse().unwrap();
            assert_eq!(parsed, policy);
        }
        let err = "newest".parse::<TieBreak>().unwrap_err();
        assert_eq!(err.to_string(), "unknown tie-break policy: newest");
    }

    #[test]
    fn parse_time_zone_accepts_iana_names() {
        assert_eq!(
            parse_time_zone("America/New_York").unwrap(),
            Tz::America__New_York
        );
        assert_eq!(
            parse_time_zone("Mars/Olympus"),
            Err(ConfigError::InvalidTimeZone("Mars/Olympus".to_string()))
        );
    }
}
