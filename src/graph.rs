//! Entity Reference Graph
//!
//! Directed graph with one node per content type / component and one edge per
//! attribute that references another entity (relation target, embedded
//! component, dynamic-zone member). Built on demand from the live maps; used
//! to find the entities a delete has to cascade into.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::attribute::Attribute;
use crate::entity::{Entity, EntityKind};
use crate::snapshot::EntityMap;
use crate::status::Status;
use crate::store::SchemaStore;

/// How one entity references another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceKind {
    /// Relation attribute targeting a content type
    Relation,
    /// Component attribute embedding a component
    Component,
    /// Dynamic zone allowing a component
    DynamicZone,
}

/// Node weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityNode {
    pub kind: EntityKind,
    pub uid: String,
    pub display_name: String,
    pub status: Status,
}

/// Edge weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEdge {
    pub kind: ReferenceKind,
    /// Attribute on the referring entity
    pub attribute: String,
}

/// The entity reference graph
pub struct ReferenceGraph {
    graph: DiGraph<EntityNode, ReferenceEdge>,
    node_indices: HashMap<String, NodeIndex>,
}

impl ReferenceGraph {
    /// Build from the live entity maps. References to uids that are in
    /// neither map are left out.
    pub fn build(components: &EntityMap, content_types: &EntityMap) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for entity in content_types.values().chain(components.values()) {
            let idx = graph.add_node(EntityNode {
                kind: entity.kind(),
                uid: entity.uid.clone(),
                display_name: entity.display_name().to_string(),
                status: entity.status,
            });
            node_indices.insert(entity.uid.clone(), idx);
        }

        for entity in content_types.values().chain(components.values()) {
            let source = node_indices[&entity.uid];
            for (target, edge) in references_of(entity) {
                if let Some(&target_idx) = node_indices.get(target) {
                    graph.add_edge(source, target_idx, edge);
                }
            }
        }

        Self { graph, node_indices }
    }

    pub fn from_store(store: &SchemaStore) -> Self {
        Self::build(store.components(), store.content_types())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, uid: &str) -> Option<&EntityNode> {
        self.node_indices.get(uid).map(|&idx| &self.graph[idx])
    }

    /// Entities with at least one attribute referencing `uid`, sorted by uid
    pub fn referrers(&self, uid: &str) -> Vec<(EntityKind, String)> {
        self.neighbors(uid, Direction::Incoming)
    }

    /// Entities that `uid` references, sorted by uid
    pub fn references(&self, uid: &str) -> Vec<(EntityKind, String)> {
        self.neighbors(uid, Direction::Outgoing)
    }

    /// Every (referrer, edge) pair pointing at `uid`
    pub fn incoming(&self, uid: &str) -> Vec<(&EntityNode, &ReferenceEdge)> {
        let Some(&idx) = self.node_indices.get(uid) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (&self.graph[e.source()], e.weight()))
            .collect()
    }

    fn neighbors(&self, uid: &str, direction: Direction) -> Vec<(EntityKind, String)> {
        let Some(&idx) = self.node_indices.get(uid) else {
            return Vec::new();
        };

        let distinct: BTreeMap<String, EntityKind> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| match direction {
                Direction::Incoming => e.source(),
                Direction::Outgoing => e.target(),
            })
            .map(|n| {
                let node = &self.graph[n];
                (node.uid.clone(), node.kind)
            })
            .collect();

        distinct.into_iter().map(|(uid, kind)| (kind, uid)).collect()
    }

    /// Export to GraphViz DOT
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph EntityReferences {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str(
            "  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n",
        );
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#606060\"];\n");
        output.push('\n');

        for node in self.graph.node_weights() {
            let fill = match node.status {
                Status::Unchanged => "#ECEFF1",
                Status::Changed => "#FFE082",
                Status::New => "#A5D6A7",
                Status::Removed => "#EF9A9A",
            };
            let shape = match node.kind {
                EntityKind::ContentType => "box",
                EntityKind::Component => "component",
            };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\", shape={}, fillcolor=\"{}\"];\n",
                escape(&node.uid),
                escape(&node.display_name),
                shape,
                fill
            ));
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            let style = match edge.weight().kind {
                ReferenceKind::Relation => "solid",
                ReferenceKind::Component => "bold",
                ReferenceKind::DynamicZone => "dashed",
            };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\", style={}];\n",
                escape(&self.graph[edge.source()].uid),
                escape(&self.graph[edge.target()].uid),
                escape(&edge.weight().attribute),
                style
            ));
        }

        output.push_str("}\n");
        output
    }
}

fn references_of(entity: &Entity) -> Vec<(&str, ReferenceEdge)> {
    let mut refs = Vec::new();
    for attribute in entity.attributes() {
        match attribute {
            Attribute::Relation(relation) => refs.push((
                relation.target.as_str(),
                ReferenceEdge {
                    kind: ReferenceKind::Relation,
                    attribute: relation.name.clone(),
                },
            )),
            Attribute::Component(component) => refs.push((
                component.component.as_str(),
                ReferenceEdge {
                    kind: ReferenceKind::Component,
                    attribute: component.name.clone(),
                },
            )),
            Attribute::DynamicZone(zone) => {
                for member in &zone.components {
                    refs.push((
                        member.as_str(),
                        ReferenceEdge {
                            kind: ReferenceKind::DynamicZone,
                            attribute: zone.name.clone(),
                        },
                    ));
                }
            }
            Attribute::Uid(_) | Attribute::Scalar(_) => {}
        }
    }
    refs
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
