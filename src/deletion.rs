//! Deletion of catalog records and their files.
//!
//! The catalog record is always removed, whatever happens to the file.
//! File removal failures are logged and reported as `file_deleted: false`.
//! Bulk deletion isolates every entry: one failure never stops the rest.

use std::fs;
use std::path::{Path, PathBuf};

use registry_catalog::{Artifact, ArtifactKind, Catalog, Entity, Predicate, RegisteredInput};
use serde::Serialize;

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::path::PathResolver;

/// Outcome of deleting one record together with its file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalReport {
    pub id: u64,
    pub file_name: String,
    pub file_deleted: bool,
}

/// Outcome of a bulk deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkRemoval {
    pub processed: usize,
    pub files_deleted: usize,
    /// One message per isolated failure.
    pub errors: Vec<String>,
}

pub struct DeletionCoordinator<'a, C> {
    catalog: &'a C,
    resolver: &'a PathResolver,
    config: &'a RegistryConfig,
}

impl<'a, C: Catalog> DeletionCoordinator<'a, C> {
    pub fn new(catalog: &'a C, resolver: &'a PathResolver, config: &'a RegistryConfig) -> Self {
        Self {
            catalog,
            resolver,
            config,
        }
    }

    fn artifact_file(&self, artifact: &Artifact) -> Option<PathBuf> {
        let dir = self.config.directories.for_kind(artifact.kind);
        self.resolver.locate_managed(dir, &artifact.file_name)
    }

    fn input_file(&self, input: &RegisteredInput) -> Option<PathBuf> {
        self.resolver
            .locate_stored(&input.file_name, &self.config.directories.inputs)
    }

    fn retrieve<E: Entity>(&self, id: u64, kind: &'static str) -> Result<E, RegistryError> {
        self.catalog
            .retrieve::<E>(id)?
            .ok_or_else(|| RegistryError::not_found(kind, id))
    }

    /// Remove an artifact record, leaving its file alone.
    pub fn delete(&self, id: u64) -> Result<Artifact, RegistryError> {
        let artifact: Artifact = self.retrieve(id, "artifact")?;
        self.catalog.delete(&artifact)?;
        tracing::info!(id, file_name = %artifact.file_name, "deleted artifact record");
        Ok(artifact)
    }

    /// Remove an artifact record and, best effort, its file.
    pub fn delete_with_file(&self, id: u64) -> Result<RemovalReport, RegistryError> {
        let artifact: Artifact = self.retrieve(id, "artifact")?;
        let file_deleted = remove_quietly(self.artifact_file(&artifact).as_deref());
        self.catalog.delete(&artifact)?;
        tracing::info!(id, file_name = %artifact.file_name, file_deleted, "deleted artifact");

        Ok(RemovalReport {
            id,
            file_name: artifact.file_name,
            file_deleted,
        })
    }

    /// Remove every artifact of `kind` and its file.
    pub fn delete_all_with_files(&self, kind: ArtifactKind) -> Result<BulkRemoval, RegistryError> {
        let artifacts = self
            .catalog
            .query::<Artifact>(&[Predicate::eq("kind", kind.as_str())])?;
        let report = self.remove_each(artifacts, |a| self.artifact_file(a), |a| &a.file_name);
        tracing::info!(%kind, processed = report.processed, files_deleted = report.files_deleted, "bulk artifact deletion");
        Ok(report)
    }

    pub fn delete_input(&self, id: u64) -> Result<RegisteredInput, RegistryError> {
        let input: RegisteredInput = self.retrieve(id, "input")?;
        self.catalog.delete(&input)?;
        tracing::info!(id, file_name = %input.file_name, "deleted input record");
        Ok(input)
    }

    pub fn delete_input_with_file(&self, id: u64) -> Result<RemovalReport, RegistryError> {
        let input: RegisteredInput = self.retrieve(id, "input")?;
        let file_deleted = remove_quietly(self.input_file(&input).as_deref());
        self.catalog.delete(&input)?;
        tracing::info!(id, file_name = %input.file_name, file_deleted, "deleted input");

        Ok(RemovalReport {
            id,
            file_name: input.file_name,
            file_deleted,
        })
    }

    pub fn delete_all_inputs_with_files(&self) -> Result<BulkRemoval, RegistryError> {
        let inputs = self.catalog.all::<RegisteredInput>()?;
        let report = self.remove_each(inputs, |i| self.input_file(i), |i| &i.file_name);
        tracing::info!(processed = report.processed, files_deleted = report.files_deleted, "bulk input deletion");
        Ok(report)
    }

    fn remove_each<E, L, N>(&self, records: Vec<E>, locate: L, name: N) -> BulkRemoval
    where
        E: Entity,
        L: Fn(&E) -> Option<PathBuf>,
        N: Fn(&E) -> &String,
    {
        let mut report = BulkRemoval::default();

        for record in records {
            report.processed += 1;

            if let Some(path) = locate(&record) {
                match fs::remove_file(&path) {
                    Ok(()) => report.files_deleted += 1,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "could not delete file");
                        report.errors.push(format!("{}: {}", path.display(), e));
                    }
                }
            }

            if let Err(e) = self.catalog.delete(&record) {
                tracing::warn!(file_name = %name(&record), error = %e, "could not delete record");
                report.errors.push(format!("{}: {}", name(&record), e));
            }
        }
        report
    }
}

/// Delete `path` if given. Failures are logged, never raised.
fn remove_quietly(path: Option<&Path>) -> bool {
    let Some(path) = path else {
        return false;
    };
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not delete file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_catalog::FileCatalog;
    use tempfile::TempDir;

    struct Setup {
        _dir: TempDir,
        config: RegistryConfig,
        resolver: PathResolver,
        catalog: FileCatalog,
    }

    impl Setup {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = RegistryConfig::rooted_at(dir.path()).unwrap();
            fs::create_dir_all(&config.directories.algorithms).unwrap();
            fs::create_dir_all(&config.directories.inputs).unwrap();
            Self {
                resolver: PathResolver::from_config(&config),
                catalog: FileCatalog::in_memory(),
                config,
                _dir: dir,
            }
        }

        fn coordinator(&self) -> DeletionCoordinator<'_, FileCatalog> {
            DeletionCoordinator::new(&self.catalog, &self.resolver, &self.config)
        }

        fn algorithm(&self, name: &str, with_file: bool) -> u64 {
            if with_file {
                fs::write(self.config.directories.algorithms.join(name), "PK").unwrap();
            }
            self.catalog
                .store(&Artifact::new(ArtifactKind::Algorithm, name))
                .unwrap()
        }
    }

    #[test]
    fn delete_keeps_the_file() {
        let s = Setup::new();
        let id = s.algorithm("a.jar", true);

        s.coordinator().delete(id).unwrap();
        assert!(s.config.directories.algorithms.join("a.jar").exists());
        assert!(s.catalog.retrieve::<Artifact>(id).unwrap().is_none());
    }

    #[test]
    fn delete_unknown_id_is_not_found() {
        let s = Setup::new();
        assert!(s.coordinator().delete(42).unwrap_err().is_not_found());
        assert!(s.coordinator().delete_input_with_file(42).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_with_file_removes_both() {
        let s = Setup::new();
        let id = s.algorithm("b.jar", true);

        let report = s.coordinator().delete_with_file(id).unwrap();
        assert!(report.file_deleted);
        assert_eq!(report.file_name, "b.jar");
        assert!(!s.config.directories.algorithms.join("b.jar").exists());
    }

    #[test]
    fn artifact_deletion_never_touches_input_files() {
        let s = Setup::new();
        fs::write(s.config.directories.inputs.join("c.jar"), "data").unwrap();
        let id = s.algorithm("c.jar", false);

        let report = s.coordinator().delete_with_file(id).unwrap();
        assert!(!report.file_deleted);
        assert!(s.config.directories.inputs.join("c.jar").exists());
    }

    #[test]
    fn delete_input_with_file_follows_leaf_name() {
        let s = Setup::new();
        let path = s.config.directories.inputs.join("d.csv");
        fs::write(&path, "a\n").unwrap();
        let id = s
            .catalog
            .store(&RegisteredInput::new("/elsewhere/d.csv"))
            .unwrap();

        let report = s.coordinator().delete_input_with_file(id).unwrap();
        assert!(report.file_deleted);
        assert!(!path.exists());
        assert!(s.catalog.all::<RegisteredInput>().unwrap().is_empty());
    }
}
