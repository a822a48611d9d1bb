//! Built-in civic missions.

use access_types::{MissionDefinition, MissionRequirements, Tier};

pub(crate) fn civic_missions() -> Vec<MissionDefinition> {
    vec![
        MissionDefinition::new("orientation", "Civic Orientation")
            .with_category("onboarding")
            .with_description("Learn how proposals, verification and moderation fit together.")
            .with_hint("Open to every citizen"),
        MissionDefinition::new("verifier-onboarding", "Verifier Onboarding")
            .with_category("verification")
            .with_description("Review evidence submitted with community proposals.")
            .with_requirements(
                MissionRequirements::new(Tier::Verifier, 50).with_replay_of("orientation"),
            )
            .with_hint("Complete Civic Orientation")
            .with_hint("Reach the Verifier tier")
            .with_hint("Keep your trust score at 50 or above"),
        MissionDefinition::new("moderation-desk", "Moderation Desk")
            .with_category("moderation")
            .with_description("Triage reports and apply community guidelines.")
            .with_requirements(MissionRequirements::new(Tier::Moderator, 65).with_feedback())
            .with_hint("Reach the Moderator tier")
            .with_hint("Earn a feedback badge from a peer review"),
        MissionDefinition::new("budget-assembly", "Participatory Budget Assembly")
            .with_category("governance")
            .with_description("Deliberate on and vote for neighbourhood budget lines.")
            .with_requirements(
                MissionRequirements::new(Tier::Verifier, 60)
                    .with_replay_of("verifier-onboarding")
                    .with_vote(),
            )
            .with_hint("Complete Verifier Onboarding")
            .with_hint("Cast at least one verified vote"),
        MissionDefinition::new("governance-council", "Governance Council")
            .with_category("governance")
            .with_description("Draft and ratify platform-wide policy.")
            .with_requirements(
                MissionRequirements::new(Tier::Governor, 80)
                    .with_replay_of("budget-assembly")
                    .with_feedback()
                    .with_vote(),
            )
            .with_hint("Reach the Governor tier")
            .with_hint("Complete the Participatory Budget Assembly")
            .with_hint("Hold a feedback badge and a verified vote"),
    ]
}
