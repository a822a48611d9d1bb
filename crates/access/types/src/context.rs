//! Per-call user context.

use crate::ids::{MissionId, UserId};
use crate::mission::MissionDefinition;
use crate::status::AccessFacts;
use crate::tier::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest representable trust score.
pub const MAX_TRUST_SCORE: u8 = 100;

/// Proof that a mission was completed, asserted by the replay subsystem
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub mission_id: MissionId,
    /// Opaque reference to the replay trace. Stored, never verified here.
    pub trace_hash: String,
    pub validated_at: DateTime<Utc>,
    pub is_valid: bool,
}

impl ReplayRecord {
    pub fn valid(mission_id: impl Into<String>, trace_hash: impl Into<String>) -> Self {
        Self {
            mission_id: MissionId::new(mission_id),
            trace_hash: trace_hash.into(),
            validated_at: Utc::now(),
            is_valid: true,
        }
    }
}

/// Everything the evaluator knows about a user for one decision
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: UserId,
    pub tier: Tier,
    pub trust_score: u8,
    #[serde(default)]
    pub replay_history: Vec<ReplayRecord>,
    #[serde(default)]
    pub feedback_badges: Vec<String>,
    #[serde(default)]
    pub verified_votes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, tier: Tier, trust_score: u8) -> Self {
        Self {
            user_id: UserId::new(user_id),
            tier,
            trust_score,
            replay_history: vec![],
            feedback_badges: vec![],
            verified_votes: 0,
            last_activity_at: None,
        }
    }

    pub fn with_replay(mut self, record: ReplayRecord) -> Self {
        self.replay_history.push(record);
        self
    }

    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.feedback_badges.push(badge.into());
        self
    }

    pub fn with_verified_votes(mut self, votes: u32) -> Self {
        self.verified_votes = votes;
        self
    }

    /// Reject contexts that could not have come from a real session.
    pub fn validate(&self) -> Result<(), ContextError> {
        if self.user_id.0.trim().is_empty() {
            return Err(ContextError::MissingUserId);
        }
        if self.trust_score > MAX_TRUST_SCORE {
            return Err(ContextError::TrustScoreOutOfRange(self.trust_score));
        }
        if let Some(record) = self
            .replay_history
            .iter()
            .find(|record| record.mission_id.0.trim().is_empty())
        {
            return Err(ContextError::InvalidReplayRecord(format!(
                "replay record {} has no mission id",
                record.trace_hash
            )));
        }
        Ok(())
    }

    /// Latest valid replay of `mission_id`, if any.
    pub fn valid_replay_of(&self, mission_id: &MissionId) -> Option<&ReplayRecord> {
        self.replay_history
            .iter()
            .filter(|record| record.is_valid && record.mission_id == *mission_id)
            .max_by_key(|record| record.validated_at)
    }

    pub fn facts_for(&self, mission: &MissionDefinition) -> AccessFacts {
        AccessFacts {
            tier: self.tier,
            trust_score: self.trust_score,
            replay_validated: self.valid_replay_of(mission.replay_target()).is_some(),
            has_feedback_badge: !self.feedback_badges.is_empty(),
            has_verified_vote: self.verified_votes > 0,
        }
    }
}

/// Malformed user context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("user context is missing a user id")]
    MissingUserId,

    #[error("trust score {0} is outside 0-100")]
    TrustScoreOutOfRange(u8),

    #[error("invalid replay record: {0}")]
    InvalidReplayRecord(String),
}
