//! Evaluation output: blockers, requirement snapshot, next steps.

use crate::ids::MissionId;
use crate::status::{AccessStatus, UnlockMethod};
use crate::tier::Tier;
use serde::{Deserialize, Serialize};

/// Requirement dimension a blocker refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerType {
    Tier,
    Trust,
    Replay,
    Feedback,
    Vote,
}

impl BlockerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockerType::Tier => "tier",
            BlockerType::Trust => "trust",
            BlockerType::Replay => "replay",
            BlockerType::Feedback => "feedback",
            BlockerType::Vote => "vote",
        }
    }

    pub fn priority(&self) -> BlockerPriority {
        match self {
            BlockerType::Tier | BlockerType::Trust => BlockerPriority::High,
            BlockerType::Replay | BlockerType::Feedback | BlockerType::Vote => {
                BlockerPriority::Medium
            }
        }
    }
}

impl std::fmt::Display for BlockerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerPriority {
    Low,
    Medium,
    High,
}

/// One unmet requirement, with explanation and remedy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockBlocker {
    pub blocker_type: BlockerType,
    pub message: String,
    pub action_required: String,
    pub priority: BlockerPriority,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCheck {
    pub required: Tier,
    pub current: Tier,
    pub satisfied: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdCheck {
    pub required: u8,
    pub current: u8,
    pub satisfied: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagCheck {
    pub required: bool,
    pub current: bool,
    pub satisfied: bool,
}

/// Required vs. current vs. satisfied, per dimension
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSnapshot {
    pub tier: TierCheck,
    pub trust: ThresholdCheck,
    pub replay: FlagCheck,
    pub feedback: FlagCheck,
    pub vote: FlagCheck,
}

/// Full eligibility verdict for one (mission, user context) pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub mission_id: MissionId,
    pub is_unlocked: bool,
    pub status: AccessStatus,
    pub blockers: Vec<UnlockBlocker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_via: Option<UnlockMethod>,
    pub requirements: RequirementSnapshot,
    pub unlock_hints: Vec<String>,
    pub next_steps: Vec<String>,
}

impl EligibilityResult {
    pub fn blocker_types(&self) -> Vec<BlockerType> {
        self.blockers.iter().map(|b| b.blocker_type).collect()
    }

    pub fn has_blocker(&self, blocker_type: BlockerType) -> bool {
        self.blockers.iter().any(|b| b.blocker_type == blocker_type)
    }
}
