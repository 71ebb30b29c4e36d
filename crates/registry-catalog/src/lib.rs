//! Catalog of registered artifacts and data inputs.
//!
//! The catalog is the only owner of persisted entity state. Callers hand it
//! immutable entity values and get values back; nothing is cached across
//! calls. Entities are keyed by a surrogate `id` assigned on first store and
//! by a natural key that the store keeps unique.

pub mod artifact;
pub mod entity;
pub mod error;
pub mod input;
pub mod store;

pub use artifact::{Artifact, ArtifactKind, Capability, UnknownCapability};
pub use entity::{Entity, EntityKind, FieldValue, Predicate};
pub use error::CatalogError;
pub use input::{ParseSettings, RegisteredInput};
pub use store::{Catalog, FileCatalog};
