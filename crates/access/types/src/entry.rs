//! Durable ledger records.

use crate::ids::{EntryId, MissionId, PairKey, UserId};
use crate::mission::MissionRequirements;
use crate::status::{AccessFacts, AccessStatus, UnlockMethod};
use crate::tier::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Facts about the user captured when the entry was written
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub user_id: UserId,
    pub user_tier: Tier,
    pub trust_score: u8,
    pub replay_validated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_verified: Option<bool>,
    /// Recorded attempts for this (mission, user) pair so far.
    pub unlock_attempts: u32,
    pub last_attempt_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One immutable audit record of a mission-access decision
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub mission_id: MissionId,
    pub status: AccessStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_trace_hash: Option<String>,
    pub tier_required: Tier,
    /// Requirements in force when the entry was written; lets the ledger
    /// re-derive status for replay and feedback updates on its own.
    pub requirements: MissionRequirements,
    pub unlocked_via: UnlockMethod,
    pub metadata: EntryMetadata,
}

impl LedgerEntry {
    pub fn user_id(&self) -> &UserId {
        &self.metadata.user_id
    }

    pub fn pair_key(&self) -> PairKey {
        PairKey::new(&self.mission_id, &self.metadata.user_id)
    }

    /// Facts as known at the time this entry was written.
    pub fn facts(&self) -> AccessFacts {
        AccessFacts {
            tier: self.metadata.user_tier,
            trust_score: self.metadata.trust_score,
            replay_validated: self.metadata.replay_validated,
            has_feedback_badge: self.metadata.feedback_badge.is_some(),
            has_verified_vote: self.metadata.vote_verified.unwrap_or(false),
        }
    }
}
