//! Server-provided schema snapshot
//!
//! A snapshot is what the schema endpoint returns: every content type and
//! component keyed by uid, plus the names new models and attributes may not use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::entity::{Entity, EntityKind};
use crate::error::{BuilderError, Result};

/// Entities keyed by uid
pub type EntityMap = BTreeMap<String, Entity>;

/// Names disallowed for new models and attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservedNames {
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl ReservedNames {
    pub fn is_reserved_model(&self, name: &str) -> bool {
        self.models.iter().any(|m| m.eq_ignore_ascii_case(name))
    }

    pub fn is_reserved_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Add names from `other` that are not already present
    pub fn extend(&mut self, other: &ReservedNames) {
        for model in &other.models {
            if !self.models.contains(model) {
                self.models.push(model.clone());
            }
        }
        for attribute in &other.attributes {
            if !self.attributes.contains(attribute) {
                self.attributes.push(attribute.clone());
            }
        }
    }
}

/// Full schema state as loaded from (or committed to) the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub components: EntityMap,
    #[serde(default)]
    pub content_types: EntityMap,
    #[serde(default)]
    pub reserved_names: ReservedNames,
}

impl Snapshot {
    /// Read a snapshot from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(content)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check that map keys match entity uids and each entity sits in the
    /// map for its model type
    pub fn validate(&self) -> Result<()> {
        validate_map(&self.components, EntityKind::Component)?;
        validate_map(&self.content_types, EntityKind::ContentType)?;

        if let Some(uid) = self
            .components
            .keys()
            .find(|uid| self.content_types.contains_key(*uid))
        {
            return Err(BuilderError::Conflict(format!(
                "{} is both a component and a content type",
                uid
            )));
        }

        Ok(())
    }
}

fn validate_map(map: &EntityMap, kind: EntityKind) -> Result<()> {
    for (key, entity) in map {
        if key != &entity.uid {
            return Err(BuilderError::InvalidPayload(format!(
                "entity keyed as {} has uid {}",
                key, entity.uid
            )));
        }
        if entity.kind() != kind {
            return Err(BuilderError::InvalidPayload(format!(
                "{} has model type {} but was listed as a {}",
                key,
                entity.kind().as_str(),
                kind
            )));
        }
    }
    Ok(())
}
