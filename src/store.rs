//! Schema Graph Store
//!
//! Holds the live draft of every content type and component next to the
//! snapshot it was loaded from, and applies edit commands while keeping
//! two-sided relations paired.
//!
//! Every command validates first and commits last: when a command returns an
//! error the store is left exactly as it was.

use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::attribute::{Attribute, DynamicZoneAttribute, RelationAttribute};
use crate::entity::{Entity, EntityDraft, EntityKind, EntitySchema};
use crate::error::{BuilderError, Result};
use crate::graph::ReferenceGraph;
use crate::save::SavePayload;
use crate::snapshot::{EntityMap, ReservedNames, Snapshot};
use crate::status::Status;

/// In-memory store of content types and components
#[derive(Debug, Clone)]
pub struct SchemaStore {
    components: EntityMap,
    content_types: EntityMap,
    initial_components: EntityMap,
    initial_content_types: EntityMap,
    reserved_names: ReservedNames,
    is_loading: bool,
}

impl Default for SchemaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaStore {
    /// Empty store, loading until [`SchemaStore::init`] is called
    pub fn new() -> Self {
        Self {
            components: EntityMap::new(),
            content_types: EntityMap::new(),
            initial_components: EntityMap::new(),
            initial_content_types: EntityMap::new(),
            reserved_names: ReservedNames::default(),
            is_loading: true,
        }
    }

    /// Store initialised from a snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut store = Self::new();
        store.init(snapshot)?;
        Ok(store)
    }

    // ========== Reads ==========

    pub fn components(&self) -> &EntityMap {
        &self.components
    }

    pub fn content_types(&self) -> &EntityMap {
        &self.content_types
    }

    pub fn initial_components(&self) -> &EntityMap {
        &self.initial_components
    }

    pub fn initial_content_types(&self) -> &EntityMap {
        &self.initial_content_types
    }

    pub fn reserved_names(&self) -> &ReservedNames {
        &self.reserved_names
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether the live draft differs from the last loaded snapshot
    pub fn is_modified(&self) -> bool {
        self.components != self.initial_components
            || self.content_types != self.initial_content_types
    }

    pub fn entity(&self, kind: EntityKind, uid: &str) -> Option<&Entity> {
        self.map(kind).get(uid)
    }

    /// Live state as a snapshot
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            components: self.components.clone(),
            content_types: self.content_types.clone(),
            reserved_names: self.reserved_names.clone(),
        }
    }

    /// Changes to send to the server on save
    pub fn save_payload(&self) -> SavePayload {
        SavePayload::from_store(self)
    }

    // ========== Lifecycle ==========

    /// Replace all state with `snapshot`; live and initial copies start equal
    pub fn init(&mut self, snapshot: Snapshot) -> Result<()> {
        snapshot.validate()?;

        info!(
            components = snapshot.components.len(),
            content_types = snapshot.content_types.len(),
            "Initialising schema store"
        );

        self.components = snapshot.components.clone();
        self.initial_components = snapshot.components;
        self.content_types = snapshot.content_types.clone();
        self.initial_content_types = snapshot.content_types;
        self.reserved_names = snapshot.reserved_names;
        self.is_loading = false;

        Ok(())
    }

    /// Re-baseline after a successful save with the server's canonical state
    pub fn commit(&mut self, saved: Snapshot) -> Result<()> {
        self.init(saved)
    }

    /// Roll the live draft back to the last loaded snapshot
    pub fn discard_changes(&mut self) {
        info!("Discarding unsaved schema changes");
        self.components = self.initial_components.clone();
        self.content_types = self.initial_content_types.clone();
    }

    /// Drop everything and go back to the loading state
    pub fn reset(&mut self) {
        info!("Resetting schema store");
        *self = Self::new();
    }

    // ========== Entity commands ==========

    /// Insert a new, unsaved content type or component
    pub fn create_entity(&mut self, kind: EntityKind, uid: &str, draft: EntityDraft) -> Result<()> {
        if self.components.contains_key(uid) || self.content_types.contains_key(uid) {
            return Err(BuilderError::Conflict(format!("{} already exists", uid)));
        }

        let entity = Entity::from_draft(kind, uid, draft)?;
        debug!(uid, kind = kind.as_str(), "Created entity");
        self.map_mut(kind).insert(uid.to_string(), entity);

        Ok(())
    }

    /// Shallow-merge `patch` into the entity's top-level schema fields.
    ///
    /// For components a `category` key moves the component to that category.
    pub fn update_entity_meta(
        &mut self,
        kind: EntityKind,
        uid: &str,
        mut patch: Map<String, Value>,
    ) -> Result<()> {
        for key in ["attributes", "modelType"] {
            if patch.contains_key(key) {
                return Err(BuilderError::InvalidPayload(format!(
                    "`{}` cannot be changed through a metadata update",
                    key
                )));
            }
        }

        let category = match (kind, patch.remove("category")) {
            (_, None) => None,
            (EntityKind::Component, Some(Value::String(category))) if !category.is_empty() => {
                Some(category)
            }
            (EntityKind::Component, Some(_)) => {
                return Err(BuilderError::InvalidPayload(
                    "component category must be a non-empty string".to_string(),
                ))
            }
            (EntityKind::ContentType, Some(_)) => {
                return Err(BuilderError::InvalidPayload(
                    "content types have no category".to_string(),
                ))
            }
        };

        if kind == EntityKind::Component && patch.contains_key("kind") {
            return Err(BuilderError::InvalidPayload(
                "components have no collection/single kind".to_string(),
            ));
        }

        let entity = self.editable_mut(kind, uid)?;

        let mut merged = serde_json::to_value(&entity.schema)?;
        if let Value::Object(fields) = &mut merged {
            fields.extend(patch);
        }
        let mut schema: EntitySchema = serde_json::from_value(merged)?;
        schema.attributes = std::mem::take(&mut entity.schema.attributes);

        entity.schema = schema;
        if category.is_some() {
            entity.category = category;
        }
        entity.touch();
        debug!(uid, "Updated entity metadata");

        Ok(())
    }

    /// Mark a component removed and strip every reference to it
    pub fn delete_component(&mut self, uid: &str) -> Result<()> {
        self.delete_entity(EntityKind::Component, uid)
    }

    /// Mark a content type removed and strip every relation targeting it
    pub fn delete_content_type(&mut self, uid: &str) -> Result<()> {
        self.delete_entity(EntityKind::ContentType, uid)
    }

    fn delete_entity(&mut self, kind: EntityKind, uid: &str) -> Result<()> {
        let status = self.require(kind, uid)?.status.transition(Status::Removed)?;

        let referrers = ReferenceGraph::build(&self.components, &self.content_types).referrers(uid);
        for (referrer_kind, referrer_uid) in referrers {
            let Some(entity) = self.map_mut(referrer_kind).get_mut(&referrer_uid) else {
                continue;
            };
            if strip_references(entity, kind, uid) {
                debug!(uid = %referrer_uid, removed = uid, "Stripped references to removed entity");
                entity.touch();
            }
        }

        if let Some(entity) = self.map_mut(kind).get_mut(uid) {
            entity.status = status;
        }
        info!(uid, kind = kind.as_str(), "Marked entity for removal");

        Ok(())
    }

    // ========== Attribute commands ==========

    /// Append an attribute. A two-sided relation to the owner itself gets its
    /// opposite attribute appended too; relations to other entities are paired
    /// only when the other side is edited.
    pub fn add_attribute(
        &mut self,
        kind: EntityKind,
        uid: &str,
        attribute: Attribute,
    ) -> Result<()> {
        let entity = self.require_editable(kind, uid)?;
        let mut attributes = entity.schema.attributes.clone();

        let opposite = match &attribute {
            Attribute::Relation(relation)
                if relation.is_internal_to(uid) && relation.is_two_sided() =>
            {
                Some(opposite_of(relation)?)
            }
            _ => None,
        };

        let name = attribute.name().to_string();
        attributes.push(attribute);
        if let Some(opposite) = opposite {
            attributes.push(opposite.into());
        }
        ensure_unique_names(uid, &attributes)?;

        let entity = self.editable_mut(kind, uid)?;
        entity.schema.attributes = attributes;
        entity.touch();
        debug!(uid, attribute = %name, "Added attribute");

        Ok(())
    }

    /// Replace the attribute currently named `initial_name` with `attribute`,
    /// reconciling the opposite side of relations to the owner itself.
    ///
    /// The pre-edit attribute is read from the live draft, not the initial
    /// snapshot, so pairs created earlier in the session are kept in step.
    /// The initial snapshot is consulted only for `pluginOptions` to carry
    /// over to a recreated opposite.
    pub fn edit_attribute(
        &mut self,
        kind: EntityKind,
        uid: &str,
        initial_name: &str,
        attribute: Attribute,
    ) -> Result<()> {
        let entity = self.require_editable(kind, uid)?;
        let index = entity
            .attribute_index(initial_name)
            .ok_or_else(|| attribute_not_found(uid, initial_name))?;
        let previous = entity.schema.attributes[index].clone();
        let mut attributes = entity.schema.attributes.clone();

        let previous_relation = previous.as_relation();
        let previous_pair = previous_relation
            .filter(|r| r.is_internal_to(uid) && r.is_two_sided())
            .and_then(|r| r.pairing_name())
            .map(String::from);
        let previous_pair_index = previous_pair
            .as_deref()
            .and_then(|pair| position_except(&attributes, pair, index));

        let relation = match attribute {
            Attribute::Relation(relation) => relation,
            other => {
                // An internal pair turned into a plain field loses its opposite
                attributes[index] = other;
                if let Some(pos) = previous_pair_index {
                    attributes.remove(pos);
                }
                ensure_unique_names(uid, &attributes)?;
                return self.commit_attributes(kind, uid, attributes, initial_name);
            }
        };

        let had_internal = previous_relation.is_some_and(|r| r.is_internal_to(uid));
        let was_two_sided = previous_relation.is_some_and(|r| r.is_two_sided());
        let target_changed = previous_relation.map_or(true, |r| r.target != relation.target);
        let kind_changed =
            previous_relation.map(|r| r.effective_kind()) != Some(relation.effective_kind());
        let is_internal = relation.is_internal_to(uid);
        let is_two_sided = relation.is_two_sided();

        let remove_for_target = target_changed && !is_internal && had_internal && was_two_sided;
        let remove_for_kind = kind_changed && had_internal && was_two_sided && !is_two_sided;
        let update_in_place = had_internal && is_internal && was_two_sided && is_two_sided;
        let create_for_kind = had_internal && is_internal && !was_two_sided && is_two_sided;
        let create_for_target = target_changed && is_internal && is_two_sided;

        let inherited_options = if remove_for_target {
            None
        } else {
            previous_pair_index
                .and_then(|pos| attributes[pos].plugin_options().cloned())
                .or_else(|| {
                    previous_relation
                        .and_then(|previous| self.displaced_plugin_options(uid, previous))
                })
        };

        let mut index = index;
        attributes[index] = Attribute::Relation(relation.clone());

        if remove_for_target || remove_for_kind {
            if let Some(pos) = previous_pair_index {
                debug!(uid, attribute = %attributes[pos].name(), "Removing opposite attribute");
                attributes.remove(pos);
                if pos < index {
                    index -= 1;
                }
            }
        }

        if create_for_kind || create_for_target {
            let mut opposite = opposite_of(&relation)?;
            opposite.plugin_options = inherited_options;
            debug!(uid, attribute = %opposite.name, "Creating opposite attribute");
            attributes.insert(index + 1, opposite.into());
        } else if update_in_place {
            let mut opposite = opposite_of(&relation)?;
            opposite.plugin_options = inherited_options;
            debug!(uid, attribute = %opposite.name, "Updating opposite attribute");
            match previous_pair_index {
                Some(pos) => attributes[pos] = opposite.into(),
                None => attributes.insert(index + 1, opposite.into()),
            }
        }

        ensure_unique_names(uid, &attributes)?;
        self.commit_attributes(kind, uid, attributes, initial_name)
    }

    /// Remove an attribute. Removing one side of an internal pair removes the
    /// other side too; uid fields derived from a removed field are detached.
    pub fn remove_field(
        &mut self,
        kind: EntityKind,
        uid: &str,
        attribute_name: &str,
    ) -> Result<()> {
        let entity = self.require_editable(kind, uid)?;
        let removed = entity
            .attribute(attribute_name)
            .ok_or_else(|| attribute_not_found(uid, attribute_name))?;
        let remove_pair = removed.is_internal_pair(uid);

        let is_opposite = |attribute: &Attribute| {
            remove_pair
                && matches!(
                    attribute,
                    Attribute::Relation(r)
                        if r.target == uid && r.target_attribute.as_deref() == Some(attribute_name)
                )
        };

        let mut removed_names = Vec::new();
        let mut attributes = Vec::with_capacity(entity.schema.attributes.len());
        for attribute in &entity.schema.attributes {
            if attribute.name() == attribute_name || is_opposite(attribute) {
                removed_names.push(attribute.name().to_string());
            } else {
                attributes.push(attribute.clone());
            }
        }

        for attribute in &mut attributes {
            if let Attribute::Uid(field) = attribute {
                if field
                    .target_field
                    .as_ref()
                    .is_some_and(|target| removed_names.contains(target))
                {
                    debug!(uid, attribute = %field.name, "Clearing uid target field");
                    field.target_field = None;
                }
            }
        }

        let entity = self.editable_mut(kind, uid)?;
        entity.schema.attributes = attributes;
        entity.touch();
        debug!(uid, removed = ?removed_names, "Removed attribute");

        Ok(())
    }

    // ========== Dynamic zone commands ==========

    /// Append components to a dynamic zone, dropping duplicates (first wins)
    pub fn add_components_to_dynamic_zone(
        &mut self,
        kind: EntityKind,
        uid: &str,
        dynamic_zone: &str,
        component_uids: &[String],
    ) -> Result<()> {
        for component_uid in component_uids {
            match self.components.get(component_uid) {
                Some(component) if !component.status.is_removed() => {}
                _ => {
                    return Err(BuilderError::EntityNotFound {
                        kind: EntityKind::Component,
                        uid: component_uid.clone(),
                    })
                }
            }
        }

        let entity = self.editable_mut(kind, uid)?;
        let zone = dynamic_zone_mut(entity, dynamic_zone)?;

        let merged: Vec<String> = {
            let mut seen = HashSet::new();
            zone.components
                .iter()
                .chain(component_uids)
                .filter(|component| seen.insert(component.as_str()))
                .cloned()
                .collect()
        };
        zone.components = merged;

        entity.touch();
        debug!(uid, dynamic_zone, added = component_uids.len(), "Added components to dynamic zone");

        Ok(())
    }

    /// Remove the component at `index` from a dynamic zone. Does nothing when
    /// the owning entity is gone or already marked for removal.
    pub fn remove_component_from_dynamic_zone(
        &mut self,
        kind: EntityKind,
        uid: &str,
        dynamic_zone: &str,
        index: usize,
    ) -> Result<()> {
        let Some(entity) = self
            .map_mut(kind)
            .get_mut(uid)
            .filter(|entity| !entity.status.is_removed())
        else {
            warn!(uid, dynamic_zone, "Dynamic zone owner no longer exists, ignoring");
            return Ok(());
        };

        let zone = dynamic_zone_mut(entity, dynamic_zone)?;
        if index >= zone.components.len() {
            return Err(BuilderError::IndexOutOfBounds {
                name: dynamic_zone.to_string(),
                index,
                len: zone.components.len(),
            });
        }
        let removed = zone.components.remove(index);

        entity.touch();
        debug!(uid, dynamic_zone, component = %removed, "Removed component from dynamic zone");

        Ok(())
    }

    // ========== Helpers ==========

    fn map(&self, kind: EntityKind) -> &EntityMap {
        match kind {
            EntityKind::ContentType => &self.content_types,
            EntityKind::Component => &self.components,
        }
    }

    fn map_mut(&mut self, kind: EntityKind) -> &mut EntityMap {
        match kind {
            EntityKind::ContentType => &mut self.content_types,
            EntityKind::Component => &mut self.components,
        }
    }

    fn require(&self, kind: EntityKind, uid: &str) -> Result<&Entity> {
        self.map(kind).get(uid).ok_or_else(|| BuilderError::EntityNotFound {
            kind,
            uid: uid.to_string(),
        })
    }

    fn require_editable(&self, kind: EntityKind, uid: &str) -> Result<&Entity> {
        let entity = self.require(kind, uid)?;
        if entity.status.is_removed() {
            return Err(BuilderError::EntityRemoved { uid: uid.to_string() });
        }
        Ok(entity)
    }

    fn editable_mut(&mut self, kind: EntityKind, uid: &str) -> Result<&mut Entity> {
        let entity = self
            .map_mut(kind)
            .get_mut(uid)
            .ok_or_else(|| BuilderError::EntityNotFound {
                kind,
                uid: uid.to_string(),
            })?;
        if entity.status.is_removed() {
            return Err(BuilderError::EntityRemoved { uid: uid.to_string() });
        }
        Ok(entity)
    }

    /// pluginOptions of the relation `previous` paired with on its target,
    /// taken from the initial snapshot first and then from the live draft.
    /// Only relations pointing back at `owner_uid` count.
    fn displaced_plugin_options(
        &self,
        owner_uid: &str,
        previous: &RelationAttribute,
    ) -> Option<Value> {
        let pair = previous.pairing_name()?;
        let initial = self
            .initial_content_types
            .get(&previous.target)
            .and_then(|target| target.attribute(pair))
            .filter(|attribute| attribute.targets(owner_uid))
            .and_then(Attribute::plugin_options);
        if let Some(options) = initial {
            return Some(options.clone());
        }

        if previous.is_internal_to(owner_uid) {
            return None;
        }
        self.content_types
            .get(&previous.target)?
            .attribute(pair)
            .filter(|attribute| attribute.targets(owner_uid))?
            .plugin_options()
            .cloned()
    }

    fn commit_attributes(
        &mut self,
        kind: EntityKind,
        uid: &str,
        attributes: Vec<Attribute>,
        edited: &str,
    ) -> Result<()> {
        let entity = self.editable_mut(kind, uid)?;
        entity.schema.attributes = attributes;
        entity.touch();
        debug!(uid, attribute = edited, "Edited attribute");
        Ok(())
    }
}

/// Opposite of a two-sided relation, failing when it has no pairing name
fn opposite_of(relation: &RelationAttribute) -> Result<RelationAttribute> {
    relation.opposite().ok_or_else(|| {
        BuilderError::InvalidPayload(format!(
            "two-sided relation {} needs a targetAttribute",
            relation.name
        ))
    })
}

fn attribute_not_found(uid: &str, name: &str) -> BuilderError {
    BuilderError::AttributeNotFound {
        uid: uid.to_string(),
        name: name.to_string(),
    }
}

fn position_except(attributes: &[Attribute], name: &str, skip: usize) -> Option<usize> {
    attributes
        .iter()
        .enumerate()
        .position(|(i, attribute)| i != skip && attribute.name() == name)
}

fn ensure_unique_names(uid: &str, attributes: &[Attribute]) -> Result<()> {
    let mut seen = HashSet::new();
    for attribute in attributes {
        if !seen.insert(attribute.name()) {
            return Err(BuilderError::Conflict(format!(
                "attribute {} already exists on {}",
                attribute.name(),
                uid
            )));
        }
    }
    Ok(())
}

fn dynamic_zone_mut<'a>(
    entity: &'a mut Entity,
    name: &str,
) -> Result<&'a mut DynamicZoneAttribute> {
    let uid = entity.uid.clone();
    match entity.schema.attributes.iter_mut().find(|a| a.name() == name) {
        Some(Attribute::DynamicZone(zone)) => Ok(zone),
        Some(_) => Err(BuilderError::NotADynamicZone {
            uid,
            name: name.to_string(),
        }),
        None => Err(attribute_not_found(&uid, name)),
    }
}

/// Drop every attribute of `entity` that references the removed entity.
/// Returns whether anything changed.
fn strip_references(entity: &mut Entity, removed_kind: EntityKind, removed_uid: &str) -> bool {
    let attributes = &mut entity.schema.attributes;
    let before = attributes.len();
    let mut changed = false;

    match removed_kind {
        EntityKind::Component => {
            attributes.retain(|attribute| !attribute.embeds(removed_uid));
            for attribute in attributes.iter_mut() {
                if let Attribute::DynamicZone(zone) = attribute {
                    let len = zone.components.len();
                    zone.components.retain(|component| component != removed_uid);
                    changed |= zone.components.len() != len;
                }
            }
        }
        EntityKind::ContentType => {
            attributes.retain(|attribute| !attribute.targets(removed_uid));
        }
    }

    changed || attributes.len() != before
}
