//! Content types and components

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

use crate::attribute::Attribute;
use crate::error::{BuilderError, Result};
use crate::status::Status;

/// Which of the two entity maps an entity lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    ContentType,
    Component,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::ContentType => "contentType",
            EntityKind::Component => "component",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::ContentType => f.write_str("content type"),
            EntityKind::Component => f.write_str("component"),
        }
    }
}

/// Collection or single type (content types only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentTypeKind {
    #[default]
    CollectionType,
    SingleType,
}

/// Top-level schema of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySchema {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContentTypeKind>,
    #[serde(default = "default_true")]
    pub visible: bool,
    pub model_type: EntityKind,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Other top-level fields (singularName, pluralName, description, ...)
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

/// A content type or component in the draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub uid: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub is_temporary: bool,
    /// Component category (components only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub schema: EntitySchema,
}

impl Entity {
    /// Build a fresh, unsaved entity from a creation draft
    pub fn from_draft(kind: EntityKind, uid: &str, draft: EntityDraft) -> Result<Self> {
        validate_uid(kind, uid)?;

        let category = match kind {
            EntityKind::Component => Some(draft.category.filter(|c| !c.is_empty()).ok_or_else(|| {
                BuilderError::InvalidPayload(format!("component {} requires a category", uid))
            })?),
            EntityKind::ContentType => None,
        };

        let content_kind = match kind {
            EntityKind::ContentType => Some(draft.kind.unwrap_or_default()),
            EntityKind::Component => None,
        };

        Ok(Self {
            uid: uid.to_string(),
            status: Status::New,
            is_temporary: true,
            category,
            schema: EntitySchema {
                display_name: draft.display_name,
                icon: draft.icon,
                kind: content_kind,
                visible: true,
                model_type: kind,
                attributes: Vec::new(),
                options: draft.options,
            },
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.schema.model_type
    }

    pub fn display_name(&self) -> &str {
        &self.schema.display_name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.schema.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.schema.attributes.iter().find(|a| a.name() == name)
    }

    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.schema.attributes.iter().position(|a| a.name() == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_index(name).is_some()
    }

    /// Mark the entity as edited
    pub fn touch(&mut self) {
        self.status = self.status.touched();
    }
}

/// Payload for creating a content type or component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDraft {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContentTypeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl EntityDraft {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_kind(mut self, kind: ContentTypeKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

fn content_type_uid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(api|plugin|admin)::[a-z0-9][a-z0-9_-]*\.[a-z0-9][a-z0-9_-]*$")
            .expect("content type uid pattern is valid")
    })
}

fn component_uid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9_-]*\.[a-z0-9][a-z0-9_-]*$")
            .expect("component uid pattern is valid")
    })
}

/// Check that `uid` has the shape expected for `kind`:
/// `api::article.article` / `plugin::users-permissions.user` for content types,
/// `category.name` for components.
pub fn validate_uid(kind: EntityKind, uid: &str) -> Result<()> {
    let pattern = match kind {
        EntityKind::ContentType => content_type_uid_pattern(),
        EntityKind::Component => component_uid_pattern(),
    };

    if pattern.is_match(uid) {
        Ok(())
    } else {
        Err(BuilderError::InvalidUid {
            kind,
            uid: uid.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_uid() {
        assert!(validate_uid(EntityKind::ContentType, "api::article.article").is_ok());
        assert!(validate_uid(EntityKind::ContentType, "plugin::users-permissions.user").is_ok());
        assert!(validate_uid(EntityKind::ContentType, "article").is_err());
        assert!(validate_uid(EntityKind::Component, "shared.seo").is_ok());
        assert!(validate_uid(EntityKind::Component, "api::shared.seo").is_err());
        assert!(validate_uid(EntityKind::Component, "Shared.Seo").is_err());
    }

    #[test]
    fn test_from_draft_content_type() {
        let entity = Entity::from_draft(
            EntityKind::ContentType,
            "api::article.article",
            EntityDraft::new("Article"),
        )
        .unwrap();
        assert_eq!(entity.status, Status::New);
        assert!(entity.is_temporary);
        assert!(entity.schema.visible);
        assert_eq!(entity.schema.kind, Some(ContentTypeKind::CollectionType));
        assert!(entity.attributes().is_empty());
        assert!(entity.category.is_none());
    }

    #[test]
    fn test_component_requires_category() {
        let err = Entity::from_draft(EntityKind::Component, "shared.seo", EntityDraft::new("Seo"))
            .unwrap_err();
        assert!(matches!(err, BuilderError::InvalidPayload(_)));

        let entity = Entity::from_draft(
            EntityKind::Component,
            "shared.seo",
            EntityDraft::new("Seo").with_category("shared"),
        )
        .unwrap();
        assert_eq!(entity.category.as_deref(), Some("shared"));
        assert_eq!(entity.kind(), EntityKind::Component);
        assert!(entity.schema.kind.is_none());
    }

    #[test]
    fn test_deserialize_server_entity() {
        let entity: Entity = serde_json::from_value(json!({
            "uid": "api::article.article",
            "schema": {
                "displayName": "Article",
                "singularName": "article",
                "pluralName": "articles",
                "kind": "collectionType",
                "modelType": "contentType",
                "attributes": [
                    { "name": "title", "type": "string" }
                ]
            }
        }))
        .unwrap();

        assert_eq!(entity.status, Status::Unchanged);
        assert!(!entity.is_temporary);
        assert!(entity.schema.visible);
        assert_eq!(entity.schema.options["pluralName"], json!("articles"));
        assert!(entity.has_attribute("title"));
    }
}
