//! Blocker wording. Messages explain the gap; actions name the remedy.

use access_types::{BlockerType, MissionId, Tier, UnlockBlocker};

fn blocker(blocker_type: BlockerType, message: String, action_required: String) -> UnlockBlocker {
    UnlockBlocker {
        blocker_type,
        message,
        action_required,
        priority: blocker_type.priority(),
    }
}

pub(crate) fn tier(required: Tier, current: Tier) -> UnlockBlocker {
    blocker(
        BlockerType::Tier,
        format!(
            "Requires {} tier or above (current: {}, {} level(s) short)",
            required,
            current,
            required.gap(current)
        ),
        format!("Advance your civic tier to {}", required),
    )
}

pub(crate) fn trust(required: u8, current: u8) -> UnlockBlocker {
    blocker(
        BlockerType::Trust,
        format!("Requires a trust score of {} (current: {})", required, current),
        format!(
            "Raise your trust score by {} points to reach {}",
            required.saturating_sub(current),
            required
        ),
    )
}

pub(crate) fn replay(prerequisite: &MissionId) -> UnlockBlocker {
    blocker(
        BlockerType::Replay,
        format!("Requires a validated replay of mission {}", prerequisite),
        format!("Complete mission {} and submit its replay for validation", prerequisite),
    )
}

pub(crate) fn feedback() -> UnlockBlocker {
    blocker(
        BlockerType::Feedback,
        "Requires a community feedback badge".to_string(),
        "Earn a feedback badge by taking part in a peer review".to_string(),
    )
}

pub(crate) fn vote() -> UnlockBlocker {
    blocker(
        BlockerType::Vote,
        "Requires at least one verified vote".to_string(),
        "Cast a vote in an open proposal and wait for it to be verified".to_string(),
    )
}
