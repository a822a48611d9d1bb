//! Mission definitions and their access requirements.

use crate::ids::MissionId;
use crate::tier::Tier;
use serde::{Deserialize, Serialize};

/// Access policy of a single mission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MissionRequirements {
    #[serde(default)]
    pub min_tier: Tier,
    /// Minimum trust score, 0-100.
    #[serde(default)]
    pub min_trust_score: u8,
    #[serde(default)]
    pub require_replay: bool,
    /// Prerequisite mission whose validated replay unlocks this one. When
    /// absent, a validated replay of the mission itself is required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_mission_id: Option<MissionId>,
    #[serde(default)]
    pub require_feedback: bool,
    #[serde(default)]
    pub require_vote: bool,
}

impl MissionRequirements {
    pub fn new(min_tier: Tier, min_trust_score: u8) -> Self {
        Self {
            min_tier,
            min_trust_score,
            ..Default::default()
        }
    }

    pub fn with_replay_of(mut self, mission_id: impl Into<String>) -> Self {
        self.require_replay = true;
        self.replay_mission_id = Some(MissionId::new(mission_id));
        self
    }

    pub fn with_feedback(mut self) -> Self {
        self.require_feedback = true;
        self
    }

    pub fn with_vote(mut self) -> Self {
        self.require_vote = true;
        self
    }
}

/// Immutable catalog record of a gated mission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionDefinition {
    pub id: MissionId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub requirements: MissionRequirements,
    /// Shown to users in order when the mission is locked.
    #[serde(default)]
    pub unlock_hints: Vec<String>,
    /// Opaque route handed to the presentation layer.
    #[serde(default)]
    pub route: String,
}

impl MissionDefinition {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let id = MissionId::new(id);
        let route = format!("/missions/{}", id);
        Self {
            id,
            title: title.into(),
            description: String::new(),
            category: "general".to_string(),
            requirements: MissionRequirements::default(),
            unlock_hints: vec![],
            route,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_requirements(mut self, requirements: MissionRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.unlock_hints.push(hint.into());
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    /// Mission whose validated replay satisfies the replay requirement.
    pub fn replay_target(&self) -> &MissionId {
        self.requirements
            .replay_mission_id
            .as_ref()
            .unwrap_or(&self.id)
    }
}
