//! Ledger capacity and reporting configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Default bound on retained entries.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Total entries retained before the oldest is evicted.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Window used for the recent-activity statistic, in hours.
    #[serde(default = "default_recent_window_hours")]
    pub recent_window_hours: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            recent_window_hours: default_recent_window_hours(),
        }
    }
}

impl LedgerConfig {
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Negative values collapse to an empty window; values past chrono's
    /// range saturate.
    pub fn recent_window(&self) -> Duration {
        Duration::try_hours(self.recent_window_hours.max(0)).unwrap_or(Duration::MAX)
    }
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_recent_window_hours() -> i64 {
    24
}
