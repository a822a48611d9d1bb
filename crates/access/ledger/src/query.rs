use access_types::{AccessStatus, LedgerEntry, MissionId, Tier, UnlockMethod, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Query parameters for ledger search. Unset fields match everything.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerQuery {
    pub mission_id: Option<MissionId>,
    pub user_id: Option<UserId>,
    pub status: Option<AccessStatus>,
    pub limit: Option<usize>,
}

impl LedgerQuery {
    pub fn for_pair(mission_id: &MissionId, user_id: &UserId) -> Self {
        Self {
            mission_id: Some(mission_id.clone()),
            user_id: Some(user_id.clone()),
            ..Default::default()
        }
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(ref mission_id) = self.mission_id {
            if entry.mission_id != *mission_id {
                return false;
            }
        }

        if let Some(ref user_id) = self.user_id {
            if entry.metadata.user_id != *user_id {
                return false;
            }
        }

        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }

        true
    }
}

/// Statistics about the ledger.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerStatistics {
    pub total_entries: usize,
    pub by_status: HashMap<AccessStatus, usize>,
    pub by_tier: HashMap<Tier, usize>,
    pub by_unlock_method: HashMap<UnlockMethod, usize>,
    pub average_trust_score: f64,
    /// Entries written inside the recent-activity window.
    pub recent_activity: usize,
    pub recent_window_hours: i64,
}
