//! Configuration loading and management.

use std::path::{Path, PathBuf};

use ct_core::{ConfigError, ScheduleConfig, TieBreak, parse_time_zone};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Calendar whose events drive the schedule.
    pub calendar: String,

    /// Spacing between buckets.
    pub granularity_minutes: i64,

    /// Width of the window resolved on each pass.
    pub lookahead_minutes: i64,

    /// Target reported when no event governs the current bucket.
    pub default_target: i32,

    /// IANA zone whose midnight starts an all-day event.
    pub all_day_timezone: String,

    /// Which overlapping event wins a bucket.
    pub tie_break: TieBreak,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let schedule = ScheduleConfig::default();
        Self {
            database_path: data_dir.join("ct.db"),
            calendar: "Thermostat".to_string(),
            granularity_minutes: i64::from(schedule.granularity),
            lookahead_minutes: i64::from(schedule.lookahead_minutes),
            default_target: 0,
            all_day_timezone: schedule.all_day_zone.name().to_string(),
            tie_break: schedule.tie_break,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (CT_*)
        figment = figment.merge(Env::prefixed("CT_"));

        figment.extract()
    }

    /// Validates the resolution settings.
    pub fn schedule_config(&self) -> Result<ScheduleConfig, ConfigError> {
        let zone = parse_time_zone(&self.all_day_timezone)?;
        Ok(
            ScheduleConfig::new(self.granularity_minutes, self.lookahead_minutes)?
                .with_tie_break(self.tie_break)
                .with_all_day_zone(zone),
        )
    }
}

/// Returns the platform-specific config directory for ct.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ct"))
}

/// Returns the platform-specific data directory for ct.
///
/// On Linux: `~/.local/share/ct`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ct"))
}
