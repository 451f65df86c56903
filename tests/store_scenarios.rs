//! Store Behaviour Tests
//!
//! End-to-end checks of relation pairing, delete cascades and rollback through
//! the public API.

use schema_builder::{
    consistency, Attribute, BuilderError, EntityKind, RelationAttribute, RelationKind, SchemaStore,
    Snapshot, Status,
};
use serde_json::json;

const ARTICLE: &str = "api::article.article";

fn blog() -> SchemaStore {
    let snapshot = Snapshot::from_json_str(include_str!("fixtures/snapshot.json")).unwrap();
    SchemaStore::from_snapshot(snapshot).unwrap()
}

fn empty_article() -> SchemaStore {
    let snapshot: Snapshot = serde_json::from_value(json!({
        "components": {},
        "contentTypes": {
            "api::article.article": {
                "uid": "api::article.article",
                "schema": { "displayName": "Article", "modelType": "contentType", "attributes": [] }
            }
        }
    }))
    .unwrap();
    SchemaStore::from_snapshot(snapshot).unwrap()
}

fn names(store: &SchemaStore, kind: EntityKind, uid: &str) -> Vec<String> {
    store
        .entity(kind, uid)
        .unwrap()
        .attributes()
        .iter()
        .map(|a| a.name().to_string())
        .collect()
}

fn self_relation(name: &str, kind: RelationKind, pair: Option<&str>) -> Attribute {
    let relation = RelationAttribute::new(name, kind, ARTICLE);
    match pair {
        Some(pair) => relation.with_target_attribute(pair).into(),
        None => relation.into(),
    }
}

// =============================================================================
// Relation pairing
// =============================================================================

#[test]
fn test_self_relation_add_then_remove() {
    let mut store = empty_article();

    store
        .add_attribute(
            EntityKind::ContentType,
            ARTICLE,
            self_relation("related", RelationKind::OneToMany, Some("parent")),
        )
        .unwrap();

    let article = store.entity(EntityKind::ContentType, ARTICLE).unwrap();
    assert_eq!(names(&store, EntityKind::ContentType, ARTICLE), vec!["related", "parent"]);
    let parent = article.attribute("parent").and_then(Attribute::as_relation).unwrap();
    assert_eq!(parent.relation, RelationKind::ManyToOne);
    assert_eq!(parent.target, ARTICLE);

    store.remove_field(EntityKind::ContentType, ARTICLE, "related").unwrap();
    assert!(names(&store, EntityKind::ContentType, ARTICLE).is_empty());
    assert_eq!(
        store.entity(EntityKind::ContentType, ARTICLE).unwrap().status,
        Status::Changed
    );
}

#[test]
fn test_removing_the_opposite_side_removes_the_pair() {
    let mut store = empty_article();
    store
        .add_attribute(
            EntityKind::ContentType,
            ARTICLE,
            self_relation("related", RelationKind::ManyToMany, Some("relatedBy")),
        )
        .unwrap();
    store.remove_field(EntityKind::ContentType, ARTICLE, "relatedBy").unwrap();
    assert!(names(&store, EntityKind::ContentType, ARTICLE).is_empty());
}

#[test]
fn test_one_way_never_creates_a_second_attribute() {
    let mut store = empty_article();
    for (name, kind) in [("next", RelationKind::OneWay), ("others", RelationKind::ManyWay)] {
        store
            .add_attribute(EntityKind::ContentType, ARTICLE, self_relation(name, kind, None))
            .unwrap();
    }
    assert_eq!(names(&store, EntityKind::ContentType, ARTICLE), vec!["next", "others"]);
}

#[test]
fn test_edits_keep_pairs_whole() {
    let mut store = empty_article();
    let kinds = [
        RelationKind::OneToOne,
        RelationKind::OneToMany,
        RelationKind::ManyToOne,
        RelationKind::ManyToMany,
        RelationKind::OneWay,
        RelationKind::ManyWay,
    ];

    store
        .add_attribute(
            EntityKind::ContentType,
            ARTICLE,
            self_relation("edge", RelationKind::OneToOne, Some("edgeOf")),
        )
        .unwrap();

    for (step, kind) in kinds.iter().cycle().take(18).enumerate() {
        let pair = format!("pair{}", step);
        let attribute = if kind.is_one_sided() {
            self_relation("edge", *kind, None)
        } else {
            self_relation("edge", *kind, Some(&pair))
        };
        store
            .edit_attribute(EntityKind::ContentType, ARTICLE, "edge", attribute)
            .unwrap();

        let report = consistency::check(&store);
        assert!(report.is_clean(), "step {}: {:?}", step, report.diagnostics);

        let expected = if kind.is_one_sided() { 1 } else { 2 };
        assert_eq!(
            names(&store, EntityKind::ContentType, ARTICLE).len(),
            expected,
            "step {} ({})",
            step,
            kind
        );
    }
}

#[test]
fn test_cross_entity_relation_is_paired_when_edited_into_self_relation() {
    let mut store = blog();
    let to_author = RelationAttribute::new("reviewer", RelationKind::OneToOne, "api::author.author")
        .with_target_attribute("reviewed");
    store
        .add_attribute(EntityKind::ContentType, ARTICLE, to_author.into())
        .unwrap();
    assert!(!names(&store, EntityKind::ContentType, "api::author.author")
        .contains(&"reviewed".to_string()));

    store
        .edit_attribute(
            EntityKind::ContentType,
            ARTICLE,
            "reviewer",
            self_relation("reviewer", RelationKind::OneToOne, Some("reviewed")),
        )
        .unwrap();
    let article_names = names(&store, EntityKind::ContentType, ARTICLE);
    let position = article_names.iter().position(|n| n == "reviewer").unwrap();
    assert_eq!(article_names[position + 1], "reviewed");
}

// =============================================================================
// Cascades
// =============================================================================

#[test]
fn test_delete_component_strips_zone_and_component_fields() {
    let mut store = blog();
    store.delete_component("shared.quote").unwrap();

    let quote = store.entity(EntityKind::Component, "shared.quote").unwrap();
    assert_eq!(quote.status, Status::Removed);

    let article = store.entity(EntityKind::ContentType, ARTICLE).unwrap();
    match article.attribute("blocks") {
        Some(Attribute::DynamicZone(zone)) => {
            assert!(!zone.components.contains(&"shared.quote".to_string()))
        }
        other => panic!("Expected dynamic zone, got {:?}", other),
    }
    assert!(!names(&store, EntityKind::Component, "layout.hero").contains(&"quote".to_string()));
}

#[test]
fn test_delete_content_type_strips_relations() {
    let mut store = blog();
    store.delete_content_type("api::author.author").unwrap();
    assert!(!names(&store, EntityKind::ContentType, ARTICLE).contains(&"author".to_string()));
    assert!(consistency::check(&store).is_clean());

    let err = store
        .add_attribute(
            EntityKind::ContentType,
            "api::author.author",
            Attribute::scalar("bio", "text"),
        )
        .unwrap_err();
    assert!(matches!(err, BuilderError::EntityRemoved { .. }));
}

#[test]
fn test_removed_components_cannot_join_zones() {
    let mut store = blog();
    store.delete_component("shared.seo").unwrap();
    let err = store
        .add_components_to_dynamic_zone(
            EntityKind::ContentType,
            ARTICLE,
            "blocks",
            &["shared.seo".to_string()],
        )
        .unwrap_err();
    assert!(err.is_not_found());
}

// =============================================================================
// Rollback
// =============================================================================

#[test]
fn test_discard_restores_initial_state() {
    let mut store = blog();
    let initial = store.snapshot();

    store.remove_field(EntityKind::ContentType, ARTICLE, "title").unwrap();
    store.delete_component("shared.media").unwrap();
    store.discard_changes();
    assert_eq!(store.snapshot(), initial);

    store.discard_changes();
    assert_eq!(store.snapshot(), initial);
}

#[test]
fn test_failed_command_leaves_store_untouched() {
    let mut store = blog();
    let before = store.snapshot();

    let duplicate = Attribute::scalar("slug", "string");
    assert!(store.add_attribute(EntityKind::ContentType, ARTICLE, duplicate).is_err());
    assert!(store
        .remove_component_from_dynamic_zone(EntityKind::ContentType, ARTICLE, "blocks", 9)
        .is_err());
    assert!(store
        .edit_attribute(
            EntityKind::ContentType,
            ARTICLE,
            "title",
            Attribute::scalar("slug", "string"),
        )
        .is_err());

    assert_eq!(store.snapshot(), before);
    assert!(!store.is_modified());
}
