//! Navigation menu read model
//!
//! Lists content types by kind and components grouped by category, each link
//! carrying the entity status so pending changes can be flagged.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::entity::{ContentTypeKind, Entity};
use crate::status::Status;
use crate::store::SchemaStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuLink {
    /// uid for entity links, category name for category groups
    pub name: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<MenuLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuSection {
    pub name: String,
    pub title: String,
    /// Number of entities listed, not counting category groups
    pub links_count: usize,
    pub links: Vec<MenuLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Menu {
    pub sections: Vec<MenuSection>,
}

impl Menu {
    /// Build the menu, keeping only entities whose display name fuzzily
    /// matches `search` when one is given
    pub fn build(store: &SchemaStore, search: Option<&str>) -> Self {
        let query = search.map(str::trim).filter(|q| !q.is_empty());
        let matcher = SkimMatcherV2::default();
        let matches = |entity: &Entity| match query {
            Some(query) => matcher.fuzzy_match(entity.display_name(), query).is_some(),
            None => true,
        };

        let content_types: Vec<&Entity> = store
            .content_types()
            .values()
            .filter(|e| e.schema.visible && matches(*e))
            .collect();

        let collection_types = links(
            content_types
                .iter()
                .copied()
                .filter(|e| e.schema.kind.unwrap_or_default() == ContentTypeKind::CollectionType),
        );
        let single_types = links(
            content_types
                .iter()
                .copied()
                .filter(|e| e.schema.kind == Some(ContentTypeKind::SingleType)),
        );

        let mut categories: BTreeMap<String, Vec<&Entity>> = BTreeMap::new();
        for component in store.components().values().filter(|e| matches(*e)) {
            let category = component.category.clone().unwrap_or_default();
            categories.entry(category).or_default().push(component);
        }
        let components_count = categories.values().map(Vec::len).sum();
        let mut component_links: Vec<MenuLink> = categories
            .into_iter()
            .map(|(category, entities)| MenuLink {
                name: category.clone(),
                title: category,
                status: None,
                links: links(entities.into_iter()),
            })
            .collect();
        component_links.sort_by_key(|link| link.title.to_lowercase());

        Self {
            sections: vec![
                section("models", "Collection Types", collection_types),
                section("singleTypes", "Single Types", single_types),
                MenuSection {
                    name: "components".to_string(),
                    title: "Components".to_string(),
                    links_count: components_count,
                    links: component_links,
                },
            ],
        }
    }

    pub fn section(&self, name: &str) -> Option<&MenuSection> {
        self.sections.iter().find(|s| s.name == name)
    }
}

fn section(name: &str, title: &str, links: Vec<MenuLink>) -> MenuSection {
    MenuSection {
        name: name.to_string(),
        title: title.to_string(),
        links_count: links.len(),
        links,
    }
}

fn links<'a>(entities: impl Iterator<Item = &'a Entity>) -> Vec<MenuLink> {
    let mut links: Vec<MenuLink> = entities
        .map(|entity| MenuLink {
            name: entity.uid.clone(),
            title: entity.display_name().to_string(),
            status: Some(entity.status),
            links: Vec::new(),
        })
        .collect();
    links.sort_by_key(|link| link.title.to_lowercase());
    links
}
