//! Registry errors and their client-facing form.

use std::io;
use std::path::PathBuf;

use registry_catalog::CatalogError;
use registry_reader::ReaderError;
use serde::Serialize;
use thiserror::Error;

use crate::introspect::LoadError;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The named record or file does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// A caller-supplied field failed validation.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("artifact could not be loaded: {0}")]
    Load(#[from] LoadError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ReaderError,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl RegistryError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Catalog(CatalogError::NotFound { .. })
        )
    }

    /// Collapse into the single shape a client sees.
    pub fn to_client_error(&self) -> ClientError {
        let code = if self.is_not_found() {
            ClientCode::NotFound
        } else {
            ClientCode::BadRequest
        };
        ClientError {
            code,
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientCode {
    NotFound,
    BadRequest,
}

/// Error as reported across the outer boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientError {
    pub code: ClientCode,
    pub message: String,
}
