//! Schema Consistency Checks
//!
//! Walks the live draft and reports everything that breaks the pairing and
//! reference rules the store maintains:
//!
//! 1. **Pairing**: a two-sided relation to the owner itself has a matching
//!    opposite attribute (name, direction, kind)
//! 2. **One-sidedness**: nothing pairs with a `oneWay` / `manyWay` relation
//! 3. **Unique names**: attribute names are unique per entity
//! 4. **Live references**: components, dynamic-zone members and relation
//!    targets exist and are not marked for removal
//!
//! Two-sided relations to *other* content types are only paired when the
//! other side is edited, so a missing opposite there is a warning.

use serde::Serialize;
use std::collections::HashSet;

use crate::attribute::{Attribute, RelationAttribute};
use crate::entity::{Entity, EntityKind};
use crate::store::SchemaStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub message: String,
}

/// All findings for a store
#[derive(Debug, Default, Serialize)]
pub struct ConsistencyReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ConsistencyReport {
    /// No errors (warnings allowed)
    pub fn is_clean(&self) -> bool {
        !self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.diagnostics.iter().map(|d| d.code).collect()
    }

    fn push(
        &mut self,
        code: &'static str,
        severity: Severity,
        entity: &Entity,
        attribute: &str,
        message: String,
    ) {
        self.diagnostics.push(Diagnostic {
            code,
            severity,
            uid: entity.uid.clone(),
            attribute: Some(attribute.to_string()),
            message,
        });
    }
}

/// Check every entity that is not marked for removal
pub fn check(store: &SchemaStore) -> ConsistencyReport {
    let mut report = ConsistencyReport::default();

    let entities = store
        .content_types()
        .values()
        .chain(store.components().values())
        .filter(|e| !e.status.is_removed());

    for entity in entities {
        check_unique_names(entity, &mut report);
        for attribute in entity.attributes() {
            match attribute {
                Attribute::Relation(relation) => {
                    check_relation(store, entity, relation, &mut report)
                }
                Attribute::Component(component) => check_component_ref(
                    store,
                    entity,
                    &component.name,
                    &component.component,
                    "dangling-component",
                    &mut report,
                ),
                Attribute::DynamicZone(zone) => {
                    for member in &zone.components {
                        check_component_ref(
                            store,
                            entity,
                            &zone.name,
                            member,
                            "dangling-dynamic-zone",
                            &mut report,
                        );
                    }
                }
                Attribute::Uid(field) => {
                    if let Some(target) = &field.target_field {
                        if !entity.has_attribute(target) {
                            report.push(
                                "dangling-target-field",
                                Severity::Warning,
                                entity,
                                &field.name,
                                format!("uid field derives from missing field {}", target),
                            );
                        }
                    }
                }
                Attribute::Scalar(_) => {}
            }
        }
    }

    report
}

fn check_unique_names(entity: &Entity, report: &mut ConsistencyReport) {
    let mut seen = HashSet::new();
    for attribute in entity.attributes() {
        if !seen.insert(attribute.name()) {
            report.push(
                "duplicate-attribute",
                Severity::Error,
                entity,
                attribute.name(),
                format!("attribute {} is declared more than once", attribute.name()),
            );
        }
    }
}

fn check_component_ref(
    store: &SchemaStore,
    entity: &Entity,
    attribute: &str,
    component_uid: &str,
    code: &'static str,
    report: &mut ConsistencyReport,
) {
    match store.entity(EntityKind::Component, component_uid) {
        Some(component) if !component.status.is_removed() => {}
        Some(_) => report.push(
            code,
            Severity::Error,
            entity,
            attribute,
            format!("references component {} which is marked for removal", component_uid),
        ),
        None => report.push(
            code,
            Severity::Error,
            entity,
            attribute,
            format!("references unknown component {}", component_uid),
        ),
    }
}

fn check_relation(
    store: &SchemaStore,
    entity: &Entity,
    relation: &RelationAttribute,
    report: &mut ConsistencyReport,
) {
    let Some(target) = store.entity(EntityKind::ContentType, &relation.target) else {
        report.push(
            "dangling-relation",
            Severity::Error,
            entity,
            &relation.name,
            format!("targets unknown content type {}", relation.target),
        );
        return;
    };

    if target.status.is_removed() {
        report.push(
            "dangling-relation",
            Severity::Error,
            entity,
            &relation.name,
            format!("targets {} which is marked for removal", relation.target),
        );
        return;
    }

    let internal = relation.is_internal_to(&entity.uid);

    if !relation.is_two_sided() {
        let paired = target.attributes().iter().filter_map(Attribute::as_relation).any(|other| {
            other.target == entity.uid
                && other.pairing_name() == Some(relation.name.as_str())
                && !(internal && other.name == relation.name)
        });
        if paired {
            report.push(
                "one-sided-has-opposite",
                Severity::Error,
                entity,
                &relation.name,
                format!("{} relation has an opposite attribute", relation.effective_kind()),
            );
        }
        return;
    }

    let Some(pair) = relation.pairing_name() else {
        report.push(
            "missing-pairing-name",
            Severity::Error,
            entity,
            &relation.name,
            format!("{} relation has no targetAttribute", relation.relation),
        );
        return;
    };

    if internal && pair == relation.name {
        report.push(
            "mismatched-opposite",
            Severity::Error,
            entity,
            &relation.name,
            format!("{} relation pairs with itself", relation.effective_kind()),
        );
        return;
    }

    let opposite = target.attribute(pair).and_then(Attribute::as_relation);
    let severity = if internal { Severity::Error } else { Severity::Warning };

    match opposite {
        None if target.has_attribute(pair) => report.push(
            "mismatched-opposite",
            Severity::Error,
            entity,
            &relation.name,
            format!("opposite attribute {} on {} is not a relation", pair, target.uid),
        ),
        None => report.push(
            if internal { "missing-opposite" } else { "unpaired-relation" },
            severity,
            entity,
            &relation.name,
            format!("no opposite attribute {} on {}", pair, target.uid),
        ),
        Some(opposite) => {
            let expected = relation.effective_kind().opposite();
            if opposite.target != entity.uid
                || opposite.pairing_name() != Some(relation.name.as_str())
                || opposite.effective_kind() != expected
            {
                report.push(
                    "mismatched-opposite",
                    severity,
                    entity,
                    &relation.name,
                    format!(
                        "opposite {} on {} should be {} back to {}.{}",
                        pair, target.uid, expected, entity.uid, relation.name
                    ),
                );
            }
        }
    }
}
