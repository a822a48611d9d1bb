//! Transient unlock attempt records kept in per-user history.

use crate::context::UserContext;
use crate::eligibility::{EligibilityResult, UnlockBlocker};
use crate::ids::{AttemptId, EntryId, MissionId, UserId};
use crate::status::UnlockMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptResult {
    Success,
    Blocked,
    /// Evaluation ran but the ledger write failed; nothing was persisted.
    Error,
}

impl AttemptResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptResult::Success => "success",
            AttemptResult::Blocked => "blocked",
            AttemptResult::Error => "error",
        }
    }
}

/// Audit record of one unlock attempt. Not the durable ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnlockAttempt {
    pub attempt_id: AttemptId,
    pub mission_id: MissionId,
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub result: AttemptResult,
    pub blockers: Vec<UnlockBlocker>,
    pub method: UnlockMethod,
    /// Ledger entry written for this attempt; `None` when the write failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<EntryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub context: UserContext,
    pub eligibility: EligibilityResult,
}

impl UnlockAttempt {
    pub fn succeeded(&self) -> bool {
        self.result == AttemptResult::Success
    }
}
