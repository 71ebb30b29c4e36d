//! Artifact introspection
//!
//! Extracting identity and capabilities from an artifact happens behind
//! [`ArtifactIntrospector`]. Registration calls it before touching the
//! catalog, so a failed load never leaves a partial record behind.

mod descriptor;

use std::path::PathBuf;

use registry_catalog::ArtifactKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use descriptor::{DescriptorIntrospector, DESCRIPTOR_EXTENSION, INTERFACE_VERSION};

/// A configuration parameter an artifact accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    /// Value type as declared, e.g. `integer` or `string`.
    #[serde(rename = "type")]
    pub value_type: String,
    pub description: Option<String>,
    #[serde(rename = "default")]
    pub default_value: Option<serde_json::Value>,
    #[serde(default)]
    pub required: bool,
}

/// What an artifact says about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub name: Option<String>,
    pub authors: Option<String>,
    pub description: Option<String>,
    /// Raw tags; unknown ones are dropped during classification.
    pub capability_tags: Vec<String>,
    pub implementation_title: Option<String>,
    pub implementation_version: Option<String>,
    pub parameters: Vec<ParameterSpec>,
}

/// Why an artifact could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("artifact file {path} does not exist")]
    NotFound { path: PathBuf },

    #[error("artifact {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("artifact {path} does not implement a supported interface: {reason}")]
    IncompatibleInterface { path: PathBuf, reason: String },
}

/// Loads an artifact from its managed directory and describes it.
pub trait ArtifactIntrospector: Send + Sync {
    fn load(&self, kind: ArtifactKind, file_name: &str) -> Result<ArtifactMetadata, LoadError>;
}
