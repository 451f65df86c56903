//! Save payload
//!
//! Collects the entities whose status says they need to reach the server.
//! Entities created and deleted within the same session never existed
//! server-side and are dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::{Entity, EntitySchema};
use crate::snapshot::EntityMap;
use crate::status::Status;
use crate::store::SchemaStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    fn for_entity(entity: &Entity) -> Option<Self> {
        match entity.status {
            Status::New => Some(ChangeAction::Create),
            Status::Changed => Some(ChangeAction::Update),
            Status::Removed if !entity.is_temporary => Some(ChangeAction::Delete),
            Status::Removed | Status::Unchanged => None,
        }
    }
}

/// One entity in the payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityChange {
    pub action: ChangeAction,
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Omitted for deletions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<EntitySchema>,
}

/// Everything a save request carries
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub prepared_at: DateTime<Utc>,
    pub components: Vec<EntityChange>,
    pub content_types: Vec<EntityChange>,
}

impl SavePayload {
    pub fn from_store(store: &SchemaStore) -> Self {
        Self {
            prepared_at: Utc::now(),
            components: changes(store.components()),
            content_types: changes(store.content_types()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.content_types.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.components.len() + self.content_types.len()
    }
}

fn changes(map: &EntityMap) -> Vec<EntityChange> {
    map.values()
        .filter_map(|entity| {
            let action = ChangeAction::for_entity(entity)?;
            Some(EntityChange {
                action,
                uid: entity.uid.clone(),
                category: entity.category.clone(),
                schema: (action != ChangeAction::Delete).then(|| entity.schema.clone()),
            })
        })
        .collect()
}
