//! Entity edit status and its allowed transitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BuilderError, Result};

/// Edit status of a content type or component in the local draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Identical to what the server last returned
    #[default]
    Unchanged,
    /// Edited since the last load
    Changed,
    /// Created locally, never saved
    New,
    /// Marked for deletion on next save
    Removed,
}

impl Status {
    /// Whether `self -> to` is an allowed edge.
    ///
    /// ```text
    /// NEW       -> NEW | REMOVED
    /// UNCHANGED -> CHANGED | REMOVED
    /// CHANGED   -> CHANGED | REMOVED
    /// REMOVED   -> (none until discard / init)
    /// ```
    pub fn can_transition_to(self, to: Status) -> bool {
        use Status::*;
        matches!(
            (self, to),
            (New, New)
                | (New, Removed)
                | (Unchanged, Changed)
                | (Unchanged, Removed)
                | (Changed, Changed)
                | (Changed, Removed)
        )
    }

    /// Move to `to`, failing on a disallowed edge
    pub fn transition(self, to: Status) -> Result<Status> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(BuilderError::InvalidTransition { from: self, to })
        }
    }

    /// Status after an edit: new stays new, removed stays removed,
    /// everything else becomes changed
    pub fn touched(self) -> Status {
        match self {
            Status::New | Status::Removed => self,
            Status::Unchanged | Status::Changed => Status::Changed,
        }
    }

    pub fn is_removed(self) -> bool {
        self == Status::Removed
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unchanged => "UNCHANGED",
            Status::Changed => "CHANGED",
            Status::New => "NEW",
            Status::Removed => "REMOVED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
