//! Civic Access Catalog - the registry of gated missions.
//!
//! The catalog is populated once at startup and shared read-only afterwards
//! (typically as `Arc<MissionCatalog>`). Registration needs `&mut self`, so a
//! shared catalog cannot change underneath its readers.

#![deny(unsafe_code)]

mod defaults;

use access_types::{MissionDefinition, MissionId, MAX_TRUST_SCORE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Static registry of mission definitions, in registration order.
#[derive(Clone, Debug, Default)]
pub struct MissionCatalog {
    missions: Vec<MissionDefinition>,
    index: HashMap<MissionId, usize>,
}

impl MissionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog seeded with the built-in civic missions.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.register(defaults::civic_missions());
        catalog
    }

    /// Register definitions. Re-registering an id replaces the stored
    /// definition in place (last write wins) and keeps its original position.
    pub fn register(&mut self, definitions: impl IntoIterator<Item = MissionDefinition>) {
        let mut added = 0usize;
        let mut replaced = 0usize;

        for definition in definitions {
            match self.index.get(&definition.id) {
                Some(&position) => {
                    debug!(mission_id = %definition.id, "Replacing mission definition");
                    self.missions[position] = definition;
                    replaced += 1;
                }
                None => {
                    self.index
                        .insert(definition.id.clone(), self.missions.len());
                    self.missions.push(definition);
                    added += 1;
                }
            }
        }

        info!(
            added,
            replaced,
            total = self.missions.len(),
            "Mission catalog updated"
        );
    }

    pub fn get(&self, mission_id: &MissionId) -> Result<&MissionDefinition, CatalogError> {
        self.index
            .get(mission_id)
            .map(|&position| &self.missions[position])
            .ok_or_else(|| CatalogError::NotFound(mission_id.clone()))
    }

    pub fn contains(&self, mission_id: &MissionId) -> bool {
        self.index.contains_key(mission_id)
    }

    /// All missions in insertion order.
    pub fn list_all(&self) -> &[MissionDefinition] {
        &self.missions
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }

    // --- Loading ---

    pub fn from_yaml_str(input: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument =
            serde_yaml::from_str(input).map_err(|err| CatalogError::Parse(err.to_string()))?;
        Self::from_document(document)
    }

    pub fn from_json_str(input: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument =
            serde_json::from_str(input).map_err(|err| CatalogError::Parse(err.to_string()))?;
        Self::from_document(document)
    }

    /// Load a catalog file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| CatalogError::Io(format!("{}: {}", path.display(), err)))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    fn from_document(document: CatalogDocument) -> Result<Self, CatalogError> {
        for definition in &document.missions {
            validate_definition(definition)?;
        }
        let mut catalog = Self::new();
        catalog.register(document.missions);
        Ok(catalog)
    }

    pub fn to_document(&self) -> CatalogDocument {
        CatalogDocument {
            missions: self.missions.clone(),
        }
    }
}

/// On-disk catalog layout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub missions: Vec<MissionDefinition>,
}

/// Reject definitions the evaluator could never satisfy sensibly.
pub fn validate_definition(definition: &MissionDefinition) -> Result<(), CatalogError> {
    if definition.id.0.trim().is_empty() {
        return Err(CatalogError::InvalidDefinition(
            "mission id must not be empty".to_string(),
        ));
    }
    if definition.title.trim().is_empty() {
        return Err(CatalogError::InvalidDefinition(format!(
            "mission {} has no title",
            definition.id
        )));
    }
    if definition.requirements.min_trust_score > MAX_TRUST_SCORE {
        return Err(CatalogError::InvalidDefinition(format!(
            "mission {} requires trust score {} above {}",
            definition.id, definition.requirements.min_trust_score, MAX_TRUST_SCORE
        )));
    }
    if definition.requirements.replay_mission_id.as_ref() == Some(&definition.id) {
        return Err(CatalogError::InvalidDefinition(format!(
            "mission {} declares itself as its replay prerequisite",
            definition.id
        )));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("mission not found: {0}")]
    NotFound(MissionId),

    #[error("invalid mission definition: {0}")]
    InvalidDefinition(String),

    #[error("catalog io error: {0}")]
    Io(String),

    #[error("catalog parse error: {0}")]
    Parse(String),
}
