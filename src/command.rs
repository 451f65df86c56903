//! Inbound commands
//!
//! One variant per store operation, deserializable from the JSON payloads UI
//! event handlers send. `action` carries the variant name:
//!
//! ```json
//! { "action": "addAttribute", "kind": "contentType", "targetUid": "api::article.article",
//!   "attribute": { "name": "title", "type": "string" } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::attribute::Attribute;
use crate::entity::{EntityDraft, EntityKind};
use crate::error::{BuilderError, Result};
use crate::snapshot::Snapshot;
use crate::store::SchemaStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    Init {
        snapshot: Snapshot,
    },
    #[serde(rename_all = "camelCase")]
    CreateEntity {
        kind: EntityKind,
        uid: String,
        data: EntityDraft,
    },
    #[serde(rename_all = "camelCase")]
    AddAttribute {
        kind: EntityKind,
        target_uid: String,
        attribute: Attribute,
    },
    #[serde(rename_all = "camelCase")]
    EditAttribute {
        kind: EntityKind,
        target_uid: String,
        initial_name: String,
        attribute: Attribute,
    },
    #[serde(rename_all = "camelCase")]
    RemoveField {
        kind: EntityKind,
        target_uid: String,
        attribute_name: String,
    },
    #[serde(rename_all = "camelCase")]
    AddComponentsToDynamicZone {
        kind: EntityKind,
        target_uid: String,
        dynamic_zone: String,
        components: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    RemoveComponentFromDynamicZone {
        kind: EntityKind,
        target_uid: String,
        dynamic_zone: String,
        index: usize,
    },
    DeleteComponent {
        uid: String,
    },
    DeleteContentType {
        uid: String,
    },
    UpdateEntityMeta {
        kind: EntityKind,
        uid: String,
        data: Map<String, Value>,
    },
    DiscardChanges,
    Reset,
}

impl Command {
    /// The `action` tag
    pub fn name(&self) -> &'static str {
        match self {
            Command::Init { .. } => "init",
            Command::CreateEntity { .. } => "createEntity",
            Command::AddAttribute { .. } => "addAttribute",
            Command::EditAttribute { .. } => "editAttribute",
            Command::RemoveField { .. } => "removeField",
            Command::AddComponentsToDynamicZone { .. } => "addComponentsToDynamicZone",
            Command::RemoveComponentFromDynamicZone { .. } => "removeComponentFromDynamicZone",
            Command::DeleteComponent { .. } => "deleteComponent",
            Command::DeleteContentType { .. } => "deleteContentType",
            Command::UpdateEntityMeta { .. } => "updateEntityMeta",
            Command::DiscardChanges => "discardChanges",
            Command::Reset => "reset",
        }
    }
}

impl SchemaStore {
    /// Apply a single command
    pub fn dispatch(&mut self, command: Command) -> Result<()> {
        debug!(action = command.name(), "Dispatching command");

        match command {
            Command::Init { snapshot } => self.init(snapshot),
            Command::CreateEntity { kind, uid, data } => self.create_entity(kind, &uid, data),
            Command::AddAttribute { kind, target_uid, attribute } => {
                self.add_attribute(kind, &target_uid, attribute)
            }
            Command::EditAttribute {
                kind,
                target_uid,
                initial_name,
                attribute,
            } => self.edit_attribute(kind, &target_uid, &initial_name, attribute),
            Command::RemoveField {
                kind,
                target_uid,
                attribute_name,
            } => self.remove_field(kind, &target_uid, &attribute_name),
            Command::AddComponentsToDynamicZone {
                kind,
                target_uid,
                dynamic_zone,
                components,
            } => self.add_components_to_dynamic_zone(kind, &target_uid, &dynamic_zone, &components),
            Command::RemoveComponentFromDynamicZone {
                kind,
                target_uid,
                dynamic_zone,
                index,
            } => self.remove_component_from_dynamic_zone(kind, &target_uid, &dynamic_zone, index),
            Command::DeleteComponent { uid } => self.delete_component(&uid),
            Command::DeleteContentType { uid } => self.delete_content_type(&uid),
            Command::UpdateEntityMeta { kind, uid, data } => {
                self.update_entity_meta(kind, &uid, data)
            }
            Command::DiscardChanges => {
                self.discard_changes();
                Ok(())
            }
            Command::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    /// Apply commands in order, stopping at the first failure.
    ///
    /// Returns how many commands were applied before the failure.
    pub fn dispatch_all(
        &mut self,
        commands: impl IntoIterator<Item = Command>,
    ) -> std::result::Result<usize, (usize, BuilderError)> {
        let mut applied = 0;
        for command in commands {
            self.dispatch(command).map_err(|e| (applied, e))?;
            applied += 1;
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;
    use serde_json::json;

    fn parse(value: Value) -> Command {
        serde_json::from_value(value).unwrap()
    }

    fn init() -> Command {
        parse(json!({
            "action": "init",
            "snapshot": {
                "contentTypes": {
                    "api::article.article": {
                        "uid": "api::article.article",
                        "schema": {
                            "displayName": "Article",
                            "modelType": "contentType",
                            "attributes": []
                        }
                    }
                },
                "components": {},
                "reservedNames": { "models": ["boolean"], "attributes": ["id"] }
            }
        }))
    }

    #[test]
    fn test_parse_tags() {
        let command = parse(json!({
            "action": "removeComponentFromDynamicZone",
            "kind": "contentType",
            "targetUid": "api::article.article",
            "dynamicZone": "blocks",
            "index": 2
        }));
        assert_eq!(command.name(), "removeComponentFromDynamicZone");
        assert!(matches!(command, Command::RemoveComponentFromDynamicZone { index: 2, .. }));

        assert_eq!(parse(json!({ "action": "discardChanges" })), Command::DiscardChanges);
        assert!(serde_json::from_value::<Command>(json!({ "action": "explode" })).is_err());
    }

    #[test]
    fn test_attribute_shape_is_validated_at_the_boundary() {
        let result = serde_json::from_value::<Command>(json!({
            "action": "addAttribute",
            "kind": "contentType",
            "targetUid": "api::article.article",
            "attribute": {
                "type": "relation",
                "relation": "oneWay",
                "target": "api::article.article"
            }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_dispatch_scenario() {
        let mut store = SchemaStore::new();
        let commands = vec![
            init(),
            parse(json!({
                "action": "addAttribute",
                "kind": "contentType",
                "targetUid": "api::article.article",
                "attribute": {
                    "name": "related",
                    "type": "relation",
                    "relation": "oneToMany",
                    "target": "api::article.article",
                    "targetAttribute": "parent"
                }
            })),
            parse(json!({
                "action": "removeField",
                "kind": "contentType",
                "targetUid": "api::article.article",
                "attributeName": "related"
            })),
        ];

        assert_eq!(store.dispatch_all(commands).unwrap(), 3);
        let article = store.entity(EntityKind::ContentType, "api::article.article").unwrap();
        assert!(article.attributes().is_empty());
        assert_eq!(article.status, Status::Changed);
        assert!(store.reserved_names().is_reserved_model("Boolean"));
    }

    #[test]
    fn test_dispatch_all_reports_failing_position() {
        let mut store = SchemaStore::new();
        let commands = vec![
            init(),
            parse(json!({ "action": "deleteComponent", "uid": "shared.missing" })),
            Command::DiscardChanges,
        ];
        let (applied, err) = store.dispatch_all(commands).unwrap_err();
        assert_eq!(applied, 1);
        assert!(matches!(err, BuilderError::EntityNotFound { .. }));
    }

    #[test]
    fn test_create_and_update_meta() {
        let mut store = SchemaStore::new();
        store.dispatch(init()).unwrap();
        store
            .dispatch(parse(json!({
                "action": "createEntity",
                "kind": "component",
                "uid": "shared.seo",
                "data": { "displayName": "Seo", "category": "shared", "icon": "search" }
            })))
            .unwrap();
        store
            .dispatch(parse(json!({
                "action": "updateEntityMeta",
                "kind": "component",
                "uid": "shared.seo",
                "data": { "displayName": "SEO", "description": "Search metadata" }
            })))
            .unwrap();

        let seo = store.entity(EntityKind::Component, "shared.seo").unwrap();
        assert_eq!(seo.display_name(), "SEO");
        assert_eq!(seo.schema.icon.as_deref(), Some("search"));
        assert_eq!(seo.schema.options["description"], json!("Search metadata"));
        assert_eq!(seo.status, Status::New);

        store.dispatch(Command::Reset).unwrap();
        assert!(store.is_loading());
    }
}
