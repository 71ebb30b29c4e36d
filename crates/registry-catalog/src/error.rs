//! Error types for catalog operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::entity::EntityKind;

/// Errors returned by a [`Catalog`](crate::Catalog).
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No record of this kind exists under the id.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },

    /// Another record already owns the natural key.
    #[error("{kind} with key '{key}' already exists")]
    UniqueViolation { kind: EntityKind, key: String },

    /// An update or delete was attempted on a value that was never stored.
    #[error("{kind} has no id; store it before updating or deleting")]
    MissingId { kind: EntityKind },

    #[error("catalog I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("catalog serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CatalogError {
    /// Whether this error is the uniqueness signal that callers may retry as an update.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}
