//! Access status derivation.
//!
//! The ledger and the eligibility evaluator both derive a pair's status
//! through [`MissionRequirements::check`] and [`RequirementChecks::status`],
//! so the single status the ledger persists always agrees with the evaluator's
//! `is_unlocked` verdict for the same facts.

use crate::mission::MissionRequirements;
use crate::tier::Tier;
use serde::{Deserialize, Serialize};

/// Status persisted on every ledger entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    Locked,
    Unlocked,
    ReplayRequired,
    TierInsufficient,
    TrustInsufficient,
    FeedbackRequired,
    Completed,
}

impl AccessStatus {
    pub const ALL: [AccessStatus; 7] = [
        AccessStatus::Locked,
        AccessStatus::Unlocked,
        AccessStatus::ReplayRequired,
        AccessStatus::TierInsufficient,
        AccessStatus::TrustInsufficient,
        AccessStatus::FeedbackRequired,
        AccessStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessStatus::Locked => "locked",
            AccessStatus::Unlocked => "unlocked",
            AccessStatus::ReplayRequired => "replay_required",
            AccessStatus::TierInsufficient => "tier_insufficient",
            AccessStatus::TrustInsufficient => "trust_insufficient",
            AccessStatus::FeedbackRequired => "feedback_required",
            AccessStatus::Completed => "completed",
        }
    }

    /// Unlocked or completed.
    pub fn grants_access(&self) -> bool {
        matches!(self, AccessStatus::Unlocked | AccessStatus::Completed)
    }
}

impl std::fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccessStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| format!("unknown access status: {}", s))
    }
}

/// How a pair came to be unlocked
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnlockMethod {
    MemoryReplay,
    IdentityTier,
    TrustThreshold,
    FeedbackBadge,
    VerifiedVote,
    AdminOverride,
    #[default]
    None,
}

impl UnlockMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnlockMethod::MemoryReplay => "memory_replay",
            UnlockMethod::IdentityTier => "identity_tier",
            UnlockMethod::TrustThreshold => "trust_threshold",
            UnlockMethod::FeedbackBadge => "feedback_badge",
            UnlockMethod::VerifiedVote => "verified_vote",
            UnlockMethod::AdminOverride => "admin_override",
            UnlockMethod::None => "none",
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, UnlockMethod::None)
    }
}

impl std::fmt::Display for UnlockMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The facts a status is derived from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessFacts {
    pub tier: Tier,
    pub trust_score: u8,
    pub replay_validated: bool,
    pub has_feedback_badge: bool,
    pub has_verified_vote: bool,
}

/// Outcome of the five requirement checks, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequirementChecks {
    pub tier_sufficient: bool,
    pub trust_sufficient: bool,
    pub replay_satisfied: bool,
    pub feedback_satisfied: bool,
    pub vote_satisfied: bool,
}

impl RequirementChecks {
    pub fn all_satisfied(&self) -> bool {
        self.tier_sufficient
            && self.trust_sufficient
            && self.replay_satisfied
            && self.feedback_satisfied
            && self.vote_satisfied
    }

    /// Single persisted status: the first failing check by priority
    /// tier > trust > replay > feedback > vote, or unlocked.
    pub fn status(&self) -> AccessStatus {
        if !self.tier_sufficient {
            AccessStatus::TierInsufficient
        } else if !self.trust_sufficient {
            AccessStatus::TrustInsufficient
        } else if !self.replay_satisfied {
            AccessStatus::ReplayRequired
        } else if !self.feedback_satisfied || !self.vote_satisfied {
            AccessStatus::FeedbackRequired
        } else {
            AccessStatus::Unlocked
        }
    }
}

impl MissionRequirements {
    pub fn check(&self, facts: &AccessFacts) -> RequirementChecks {
        RequirementChecks {
            tier_sufficient: facts.tier.satisfies(self.min_tier),
            trust_sufficient: facts.trust_score >= self.min_trust_score,
            replay_satisfied: !self.require_replay || facts.replay_validated,
            feedback_satisfied: !self.require_feedback || facts.has_feedback_badge,
            vote_satisfied: !self.require_vote || facts.has_verified_vote,
        }
    }

    pub fn derive_status(&self, facts: &AccessFacts) -> AccessStatus {
        self.check(facts).status()
    }

    /// Method credited for an unlock, by priority verified vote > feedback
    /// badge > memory replay > identity tier > trust threshold.
    pub fn unlock_method(&self, facts: &AccessFacts) -> UnlockMethod {
        let checks = self.check(facts);
        if facts.has_verified_vote {
            UnlockMethod::VerifiedVote
        } else if facts.has_feedback_badge {
            UnlockMethod::FeedbackBadge
        } else if self.require_replay && checks.replay_satisfied {
            UnlockMethod::MemoryReplay
        } else if facts.tier != Tier::Citizen {
            UnlockMethod::IdentityTier
        } else if checks.trust_sufficient {
            UnlockMethod::TrustThreshold
        } else {
            UnlockMethod::None
        }
    }
}
