//! Runtime configuration for the access core.

use access_ledger::LedgerConfig;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix, e.g. `CIVIC_ACCESS_LEDGER__MAX_ENTRIES`.
pub const ENV_PREFIX: &str = "CIVIC_ACCESS";

/// Main access configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Ledger capacity and reporting window
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Per-user attempt history
    #[serde(default)]
    pub history: HistoryConfig,

    /// Aggregate statistics
    #[serde(default)]
    pub statistics: StatisticsConfig,
}

/// Attempt history configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Attempts retained per user before the oldest is dropped
    #[serde(default = "default_max_attempts_per_user")]
    pub max_attempts_per_user: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_user: default_max_attempts_per_user(),
        }
    }
}

/// Statistics configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Blocker types listed in the frequency ranking
    #[serde(default = "default_top_blockers")]
    pub top_blockers: usize,

    /// Recent-attempt window in hours
    #[serde(default = "default_recent_window_hours")]
    pub recent_window_hours: i64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            top_blockers: default_top_blockers(),
            recent_window_hours: default_recent_window_hours(),
        }
    }
}

impl StatisticsConfig {
    /// Negative values collapse to an empty window; values past chrono's
    /// range saturate.
    pub fn recent_window(&self) -> Duration {
        Duration::try_hours(self.recent_window_hours.max(0)).unwrap_or(Duration::MAX)
    }
}

fn default_max_attempts_per_user() -> usize {
    100
}

fn default_top_blockers() -> usize {
    5
}

fn default_recent_window_hours() -> i64 {
    24
}

impl AccessConfig {
    /// Layer defaults, an optional file (TOML, YAML or JSON by extension) and
    /// `CIVIC_ACCESS_*` environment variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&AccessConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AccessConfig::default();
        assert_eq!(config.ledger.max_entries, 10_000);
        assert_eq!(config.ledger.recent_window_hours, 24);
        assert_eq!(config.history.max_attempts_per_user, 100);
        assert_eq!(config.statistics.top_blockers, 5);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[ledger]\nmax_entries = 250\n\n[history]\nmax_attempts_per_user = 7").unwrap();

        let config = AccessConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.ledger.max_entries, 250);
        assert_eq!(config.ledger.recent_window_hours, 24);
        assert_eq!(config.history.max_attempts_per_user, 7);
        assert_eq!(config.statistics.top_blockers, 5);
    }

    #[test]
    fn test_no_file_yields_defaults() {
        let config = AccessConfig::load(None).unwrap();
        assert_eq!(config.history, HistoryConfig::default());
        assert_eq!(config.statistics.recent_window(), Duration::hours(24));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AccessConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
