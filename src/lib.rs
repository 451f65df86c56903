//! Schema Builder
//!
//! An in-memory editor for content-type and component schemas. The store
//! holds a live draft next to the snapshot it was loaded from and applies
//! edit commands while keeping two-sided relations paired.
//!
//! ## Features
//!
//! - **Relation Pairing**: Two-sided relations to the owner itself always come with their
//!   opposite attribute
//! - **Delete Cascades**: Removing a component or content type strips every reference to it
//! - **Status Tracking**: Entities carry NEW / CHANGED / REMOVED marks that drive the save payload
//! - **Consistency Checks**: Pairing and reference rules verified on demand
//! - **Reference Graph**: Entity-to-entity references as a petgraph graph with DOT export
//!
//! ## Architecture
//!
//! ```text
//! Snapshot ──init──▶ SchemaStore ◀──dispatch── Command
//!                     │   │    │
//!                     │   │    └──▶ SavePayload (create / update / delete)
//!                     │   └───────▶ ReferenceGraph (cascades, DOT)
//!                     └───────────▶ consistency::check, Menu
//! ```

pub mod attribute;
pub mod command;
pub mod config;
pub mod consistency;
pub mod entity;
pub mod error;
pub mod graph;
pub mod menu;
pub mod save;
pub mod snapshot;
pub mod status;
pub mod store;

pub use attribute::{Attribute, RelationAttribute, RelationKind};
pub use command::Command;
pub use config::{BuilderConfig, OutputFormat};
pub use consistency::{ConsistencyReport, Diagnostic, Severity};
pub use entity::{ContentTypeKind, Entity, EntityDraft, EntityKind, EntitySchema};
pub use error::{BuilderError, Result};
pub use graph::{ReferenceGraph, ReferenceKind};
pub use menu::Menu;
pub use save::{ChangeAction, EntityChange, SavePayload};
pub use snapshot::{ReservedNames, Snapshot};
pub use status::Status;
pub use store::SchemaStore;
