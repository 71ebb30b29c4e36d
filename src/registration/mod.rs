//! Registration and reconciliation of artifacts.
//!
//! Every entry point introspects before it writes, so a load failure leaves
//! the catalog as it was. Records are upserted by natural key; a concurrent
//! writer that stores the same key first turns our store into an update.

mod inputs;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use registry_catalog::{Artifact, ArtifactKind, Capability, Catalog, Entity, Predicate};
use serde::Serialize;

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::introspect::{ArtifactIntrospector, ArtifactMetadata, LoadError, ParameterSpec};
use crate::path::PathResolver;
use crate::upload::{validate_file_name, FileWriter};

pub use inputs::{InputRegistrar, UploadPart};

/// How a registration call left the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "record", rename_all = "snake_case")]
pub enum Registration<E> {
    Created(E),
    Updated(E),
    /// Already registered; nothing was written.
    Unchanged(E),
}

impl<E> Registration<E> {
    pub fn record(&self) -> &E {
        match self {
            Self::Created(e) | Self::Updated(e) | Self::Unchanged(e) => e,
        }
    }

    pub fn into_record(self) -> E {
        match self {
            Self::Created(e) | Self::Updated(e) | Self::Unchanged(e) => e,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged(_))
    }
}

/// Files and records that disagree with each other.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Managed files with no catalog record.
    pub orphan_files: Vec<String>,
    /// Records whose file cannot be located.
    pub orphan_records: Vec<Artifact>,
}

/// Classify raw tags. Unknown tags are dropped.
pub fn classify(tags: &[String]) -> BTreeSet<Capability> {
    tags.iter()
        .filter_map(|tag| match Capability::parse(tag) {
            Ok(capability) => Some(capability),
            Err(e) => {
                tracing::warn!(tag = %tag, error = %e, "ignoring unknown capability");
                None
            }
        })
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Registration, update and listing of algorithms and engines.
pub struct ArtifactRegistrar<'a, C> {
    catalog: &'a C,
    introspector: &'a dyn ArtifactIntrospector,
    writer: &'a dyn FileWriter,
    resolver: &'a PathResolver,
    config: &'a RegistryConfig,
}

impl<'a, C: Catalog> ArtifactRegistrar<'a, C> {
    pub fn new(
        catalog: &'a C,
        introspector: &'a dyn ArtifactIntrospector,
        writer: &'a dyn FileWriter,
        resolver: &'a PathResolver,
        config: &'a RegistryConfig,
    ) -> Self {
        Self {
            catalog,
            introspector,
            writer,
            resolver,
            config,
        }
    }

    fn managed_dir(&self, kind: ArtifactKind) -> PathBuf {
        let dir = self.config.directories.for_kind(kind);
        self.resolver.resolve_directory(&dir.to_string_lossy())
    }

    /// Write an uploaded artifact into its managed directory and register it.
    ///
    /// Uploading a file that already exists and is already registered
    /// changes nothing.
    pub fn register_by_upload(
        &self,
        reader: &mut dyn Read,
        declared_name: &str,
        kind: ArtifactKind,
    ) -> Result<Registration<Artifact>, RegistryError> {
        let name = validate_file_name(declared_name)?;
        let dir = self.managed_dir(kind);
        let outcome = self.writer.write_to_disk(reader, name, &dir)?;

        if outcome.already_existed {
            if let Some(existing) = self.find(kind, name)? {
                tracing::info!(%kind, file_name = name, "upload matches registered artifact");
                return Ok(Registration::Unchanged(existing));
            }
        }
        self.register_by_reference(kind, name)
    }

    /// Introspect a file already in the managed directory and upsert its record.
    pub fn register_by_reference(
        &self,
        kind: ArtifactKind,
        file_name: &str,
    ) -> Result<Registration<Artifact>, RegistryError> {
        let metadata = self.introspector.load(kind, file_name)?;
        let candidate = Self::describe(kind, file_name, metadata);
        self.upsert(candidate)
    }

    /// Re-introspect a registered artifact identified by kind and file name.
    pub fn update(&self, kind: ArtifactKind, file_name: &str) -> Result<Artifact, RegistryError> {
        let stored = self
            .find(kind, file_name)?
            .ok_or_else(|| RegistryError::not_found("artifact", file_name))?;
        self.refresh(stored)
    }

    pub fn update_by_id(&self, id: u64) -> Result<Artifact, RegistryError> {
        let stored = self.get(id)?;
        self.refresh(stored)
    }

    fn refresh(&self, stored: Artifact) -> Result<Artifact, RegistryError> {
        let metadata = self.introspector.load(stored.kind, &stored.file_name)?;
        let updated = Self::describe(stored.kind, &stored.file_name, metadata).replacing(&stored);
        self.catalog.update(&updated)?;
        tracing::info!(kind = %updated.kind, file_name = %updated.file_name, "updated artifact");
        Ok(updated)
    }

    fn describe(kind: ArtifactKind, file_name: &str, metadata: ArtifactMetadata) -> Artifact {
        let name = non_blank(metadata.name).unwrap_or_else(|| file_name.to_string());
        Artifact::new(kind, file_name)
            .with_name(Some(name))
            .with_author(non_blank(metadata.authors))
            .with_description(non_blank(metadata.description))
            .with_implementation(
                non_blank(metadata.implementation_title),
                non_blank(metadata.implementation_version),
            )
            .with_capabilities(classify(&metadata.capability_tags))
    }

    fn upsert(&self, candidate: Artifact) -> Result<Registration<Artifact>, RegistryError> {
        // One retry: a lost store race reappears as an existing record.
        for _ in 0..2 {
            if let Some(stored) = self.find(candidate.kind, &candidate.file_name)? {
                if candidate.same_metadata(&stored) {
                    return Ok(Registration::Unchanged(stored));
                }
                let merged = candidate.replacing(&stored);
                self.catalog.update(&merged)?;
                tracing::info!(kind = %merged.kind, file_name = %merged.file_name, "updated artifact");
                return Ok(Registration::Updated(merged));
            }

            match self.catalog.store(&candidate) {
                Ok(id) => {
                    tracing::info!(kind = %candidate.kind, file_name = %candidate.file_name, id, "registered artifact");
                    return Ok(Registration::Created(candidate.with_id(id)));
                }
                Err(e) if e.is_unique_violation() => {
                    tracing::debug!(file_name = %candidate.file_name, "lost store race, retrying as update");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let stored = self
            .find(candidate.kind, &candidate.file_name)?
            .ok_or_else(|| RegistryError::not_found("artifact", &candidate.file_name))?;
        let merged = candidate.replacing(&stored);
        self.catalog.update(&merged)?;
        Ok(Registration::Updated(merged))
    }

    fn find(&self, kind: ArtifactKind, file_name: &str) -> Result<Option<Artifact>, RegistryError> {
        let found = self.catalog.query::<Artifact>(&[
            Predicate::eq("kind", kind.as_str()),
            Predicate::eq("file_name", file_name),
        ])?;
        Ok(found.into_iter().next())
    }

    pub fn get(&self, id: u64) -> Result<Artifact, RegistryError> {
        self.catalog
            .retrieve::<Artifact>(id)?
            .ok_or_else(|| RegistryError::not_found("artifact", id))
    }

    /// Parameters the artifact declares, read fresh from its descriptor.
    pub fn parameter_specs(&self, id: u64) -> Result<Vec<ParameterSpec>, RegistryError> {
        let artifact = self.get(id)?;
        let metadata = self.introspector.load(artifact.kind, &artifact.file_name)?;
        Ok(metadata.parameters)
    }

    /// Parameters of the configured default engine. Empty when no default
    /// is configured or its file is gone.
    pub fn default_parameter_specs(&self) -> Result<Vec<ParameterSpec>, RegistryError> {
        let Some(file_name) = self.config.default_engine.as_deref() else {
            return Ok(Vec::new());
        };
        match self.introspector.load(ArtifactKind::Engine, file_name) {
            Ok(metadata) => Ok(metadata.parameters),
            Err(LoadError::NotFound { path }) => {
                tracing::warn!(path = %path.display(), "default engine file is missing");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn list(&self, kind: ArtifactKind) -> Result<Vec<Artifact>, RegistryError> {
        Ok(self
            .catalog
            .query::<Artifact>(&[Predicate::eq("kind", kind.as_str())])?)
    }

    /// Algorithms that declare every capability in `capabilities`.
    pub fn list_with_capabilities(
        &self,
        capabilities: &[Capability],
    ) -> Result<Vec<Artifact>, RegistryError> {
        let mut predicates = vec![Predicate::eq("kind", ArtifactKind::Algorithm.as_str())];
        predicates.extend(capabilities.iter().map(|c| Predicate::eq(c.key(), true)));
        Ok(self.catalog.query::<Artifact>(&predicates)?)
    }

    /// Algorithms declaring any one of `capabilities`, ordered by id.
    fn list_with_any(&self, capabilities: &[Capability]) -> Result<Vec<Artifact>, RegistryError> {
        let mut by_id = BTreeMap::new();
        for capability in capabilities {
            for artifact in self.list_with_capabilities(&[*capability])? {
                by_id.entry(artifact.id).or_insert(artifact);
            }
        }
        Ok(by_id.into_values().collect())
    }

    pub fn list_for_file_inputs(&self) -> Result<Vec<Artifact>, RegistryError> {
        self.list_with_any(&[Capability::FileInput, Capability::RelationalInput])
    }

    pub fn list_for_table_inputs(&self) -> Result<Vec<Artifact>, RegistryError> {
        self.list_with_any(&[Capability::TableInput, Capability::RelationalInput])
    }

    pub fn list_for_database_connections(&self) -> Result<Vec<Artifact>, RegistryError> {
        self.list_with_any(&[Capability::DatabaseConnection])
    }

    /// Artifact files present in the managed directory, sorted.
    pub fn available_files(&self, kind: ArtifactKind) -> Result<Vec<String>, RegistryError> {
        let dir = self.managed_dir(kind);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RegistryError::io(&dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RegistryError::io(&dir, e))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !path.is_file() || !self.config.accepts_artifact(&path) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// List records of `kind`, persisting any metadata that changed on disk.
    /// Artifacts that no longer load are returned as stored.
    pub fn list_refreshed(&self, kind: ArtifactKind) -> Result<Vec<Artifact>, RegistryError> {
        let mut listed = Vec::new();
        for stored in self.list(kind)? {
            let metadata = match self.introspector.load(kind, &stored.file_name) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(file_name = %stored.file_name, error = %e, "skipping refresh");
                    listed.push(stored);
                    continue;
                }
            };

            let fresh = Self::describe(kind, &stored.file_name, metadata);
            if fresh.same_metadata(&stored) {
                listed.push(stored);
                continue;
            }
            let merged = fresh.replacing(&stored);
            self.catalog.update(&merged)?;
            tracing::info!(file_name = %merged.file_name, "refreshed artifact metadata");
            listed.push(merged);
        }
        Ok(listed)
    }

    pub fn reconcile(&self, kind: ArtifactKind) -> Result<ReconcileReport, RegistryError> {
        let dir = self.managed_dir(kind);
        let records = self.list(kind)?;
        let equality = self.resolver.equality();

        let recorded: BTreeSet<String> = records
            .iter()
            .map(|r| equality.key(Path::new(&r.file_name)))
            .collect();
        let orphan_files = self
            .available_files(kind)?
            .into_iter()
            .filter(|name| !recorded.contains(&equality.key(Path::new(name))))
            .collect();

        let orphan_records = records
            .into_iter()
            .filter(|r| self.resolver.locate_managed(&dir, &r.file_name).is_none())
            .collect();

        Ok(ReconcileReport {
            orphan_files,
            orphan_records,
        })
    }
}
