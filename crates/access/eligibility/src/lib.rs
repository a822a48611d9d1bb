//! Civic Access Eligibility - decides whether a user may open a mission.
//!
//! Evaluation is a pure function of a mission definition and a user context.
//! The five requirement dimensions (tier, trust, replay, feedback, vote) are
//! checked independently, so a denial lists every unmet requirement, while the
//! single persisted status comes from the shared derivation in
//! `access_types::status`.

#![deny(unsafe_code)]

mod remedies;

use access_types::{
    EligibilityResult, FlagCheck, MissionDefinition, RequirementSnapshot, ThresholdCheck,
    TierCheck, UnlockBlocker, UserContext,
};
use tracing::debug;

/// Most next steps ever suggested.
pub const MAX_NEXT_STEPS: usize = 3;

/// Shown when nothing blocks the mission.
pub const READY_PROMPT: &str = "You're all set. Open the mission to begin.";

/// Stateless evaluator.
#[derive(Clone, Copy, Debug, Default)]
pub struct EligibilityEvaluator;

impl EligibilityEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, mission: &MissionDefinition, user: &UserContext) -> EligibilityResult {
        let requirements = &mission.requirements;
        let facts = user.facts_for(mission);
        let checks = requirements.check(&facts);

        let snapshot = RequirementSnapshot {
            tier: TierCheck {
                required: requirements.min_tier,
                current: user.tier,
                satisfied: checks.tier_sufficient,
            },
            trust: ThresholdCheck {
                required: requirements.min_trust_score,
                current: user.trust_score,
                satisfied: checks.trust_sufficient,
            },
            replay: FlagCheck {
                required: requirements.require_replay,
                current: facts.replay_validated,
                satisfied: checks.replay_satisfied,
            },
            feedback: FlagCheck {
                required: requirements.require_feedback,
                current: facts.has_feedback_badge,
                satisfied: checks.feedback_satisfied,
            },
            vote: FlagCheck {
                required: requirements.require_vote,
                current: facts.has_verified_vote,
                satisfied: checks.vote_satisfied,
            },
        };

        let mut blockers = Vec::new();
        if !checks.tier_sufficient {
            blockers.push(remedies::tier(requirements.min_tier, user.tier));
        }
        if !checks.trust_sufficient {
            blockers.push(remedies::trust(requirements.min_trust_score, user.trust_score));
        }
        if !checks.replay_satisfied {
            blockers.push(remedies::replay(mission.replay_target()));
        }
        if !checks.feedback_satisfied {
            blockers.push(remedies::feedback());
        }
        if !checks.vote_satisfied {
            blockers.push(remedies::vote());
        }

        let is_unlocked = checks.all_satisfied();
        let unlocked_via = is_unlocked.then(|| requirements.unlock_method(&facts));

        debug!(
            mission_id = %mission.id,
            user_id = %user.user_id,
            is_unlocked,
            blockers = blockers.len(),
            "Evaluated mission eligibility"
        );

        EligibilityResult {
            mission_id: mission.id.clone(),
            is_unlocked,
            status: checks.status(),
            next_steps: next_steps(&blockers),
            blockers,
            unlocked_via,
            requirements: snapshot,
            unlock_hints: mission.unlock_hints.clone(),
        }
    }
}

/// Highest-priority remedies first, numbered, at most [`MAX_NEXT_STEPS`].
pub fn next_steps(blockers: &[UnlockBlocker]) -> Vec<String> {
    if blockers.is_empty() {
        return vec![READY_PROMPT.to_string()];
    }

    let mut ordered: Vec<&UnlockBlocker> = blockers.iter().collect();
    // Stable: equal priorities keep evaluation order.
    ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

    ordered
        .into_iter()
        .take(MAX_NEXT_STEPS)
        .enumerate()
        .map(|(idx, blocker)| format!("{}. {}", idx + 1, blocker.action_required))
        .collect()
}
