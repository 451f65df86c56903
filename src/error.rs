//! Error types for the schema builder

use thiserror::Error;

use crate::entity::EntityKind;
use crate::status::Status;

/// Result type for schema builder operations
pub type Result<T> = std::result::Result<T, BuilderError>;

/// Schema builder errors
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("{kind} not found: {uid}")]
    EntityNotFound { kind: EntityKind, uid: String },

    #[error("Attribute not found: {name} on {uid}")]
    AttributeNotFound { uid: String, name: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{uid} is marked for removal and cannot be edited")]
    EntityRemoved { uid: String },

    #[error("Attribute {name} on {uid} is not a dynamic zone")]
    NotADynamicZone { uid: String, name: String },

    #[error("Index {index} out of bounds for {name} (len {len})")]
    IndexOutOfBounds { name: String, index: usize, len: usize },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },

    #[error("Invalid {kind} uid: {uid}")]
    InvalidUid { kind: EntityKind, uid: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl BuilderError {
    /// True for the "does not resolve" family of errors
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BuilderError::EntityNotFound { .. } | BuilderError::AttributeNotFound { .. }
        )
    }
}
