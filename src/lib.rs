//! Artifact Registry - catalog of profiling artifacts and data inputs
//!
//! Manages algorithm and engine artifacts plus user data inputs on a managed
//! filesystem, and keeps a persistent catalog in step with the files that
//! are actually on disk.

pub mod config;
pub mod deletion;
pub mod duplicate;
pub mod error;
pub mod introspect;
pub mod path;
pub mod preview;
pub mod registration;
pub mod registry;
pub mod upload;

pub use config::{ConfigError, EnvOverrides, RegistryConfig};
pub use deletion::{BulkRemoval, DeletionCoordinator, RemovalReport};
pub use duplicate::DuplicateDetector;
pub use error::{ClientCode, ClientError, RegistryError};
pub use introspect::{
    ArtifactIntrospector, ArtifactMetadata, DescriptorIntrospector, LoadError, ParameterSpec,
};
pub use path::{PathEquality, PathResolver, Resolution, Strategy};
pub use preview::{Preview, PreviewReader};
pub use registration::{ArtifactRegistrar, InputRegistrar, ReconcileReport, Registration, UploadPart};
pub use registry::Registry;
pub use upload::{FileWriter, ManagedWriter, WriteOutcome};

pub use registry_catalog::{
    Artifact, ArtifactKind, Capability, Catalog, FileCatalog, ParseSettings, RegisteredInput,
};
