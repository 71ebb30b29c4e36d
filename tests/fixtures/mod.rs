//! Shared fixtures for the integration tests
//!
//! - `Workspace`: a temporary registry root with managed directories
//! - `StubIntrospector`: metadata served from a map instead of artifact files
//! - `FlakyCatalog`: an in-memory catalog that fails deletes on demand

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use artifact_registry::config::deep_merge;
use artifact_registry::{
    ArtifactIntrospector, ArtifactKind, ArtifactMetadata, Catalog, EnvOverrides, FileCatalog,
    LoadError, Registry, RegistryConfig,
};
use registry_catalog::{CatalogError, Entity, Predicate};
use tempfile::TempDir;

/// Temporary registry root. Paths are canonical so they compare equal to
/// resolved paths.
pub struct Workspace {
    _dir: TempDir,
    pub root: PathBuf,
    pub config: RegistryConfig,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_overrides(serde_json::json!({}))
    }

    /// Workspace whose config also merges `overrides` (paths relative to the root).
    pub fn with_overrides(overrides: serde_json::Value) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let root = dir.path().canonicalize().expect("canonical temp dir");

        let base = serde_json::json!({ "working_root": root.display().to_string() });
        let layer = deep_merge(base, overrides);
        let config = RegistryConfig::load(None, &EnvOverrides::default(), Some(layer))
            .expect("load config");

        for dir in [
            &config.directories.algorithms,
            &config.directories.engines,
            &config.directories.inputs,
        ] {
            fs::create_dir_all(dir).expect("create managed dir");
        }

        Self {
            _dir: dir,
            root,
            config,
        }
    }

    pub fn dir(&self, kind: ArtifactKind) -> &Path {
        self.config.directories.for_kind(kind)
    }

    /// Write an artifact file into its managed directory.
    pub fn artifact(&self, kind: ArtifactKind, name: &str) -> PathBuf {
        let path = self.dir(kind).join(name);
        fs::write(&path, b"PK\x03\x04").expect("write artifact");
        path
    }

    /// Write an artifact file plus a descriptor sidecar.
    pub fn described_artifact(&self, kind: ArtifactKind, name: &str, descriptor: &str) -> PathBuf {
        let path = self.artifact(kind, name);
        fs::write(self.dir(kind).join(format!("{}.toml", name)), descriptor)
            .expect("write descriptor");
        path
    }

    /// Write a data input under the input directory.
    pub fn input(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.config.directories.inputs.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create input parent");
        }
        fs::write(&path, contents).expect("write input");
        path
    }

    /// Registry over an in-memory catalog with the descriptor introspector.
    pub fn registry(&self) -> Registry<FileCatalog> {
        Registry::with_catalog(self.config.clone(), FileCatalog::in_memory())
    }

    /// Registry over an in-memory catalog with `stub` as introspector.
    pub fn stubbed(&self, stub: &StubIntrospector) -> Registry<FileCatalog> {
        self.registry().with_introspector(stub.clone())
    }

    pub fn flaky(&self, catalog: FlakyCatalog, stub: &StubIntrospector) -> Registry<FlakyCatalog> {
        Registry::with_catalog(self.config.clone(), catalog).with_introspector(stub.clone())
    }
}

/// Metadata for `tags`, named `name`.
pub fn metadata(name: &str, tags: &[&str]) -> ArtifactMetadata {
    ArtifactMetadata {
        name: Some(name.to_string()),
        authors: Some("Profiling Group".to_string()),
        description: Some(format!("{} test artifact", name)),
        capability_tags: tags.iter().map(|t| t.to_string()).collect(),
        implementation_title: Some(name.to_lowercase()),
        implementation_version: Some("1.0".to_string()),
        parameters: Vec::new(),
    }
}

/// Introspector that serves metadata from a shared map. Clones share state.
#[derive(Clone, Default)]
pub struct StubIntrospector {
    known: Arc<Mutex<HashMap<String, Result<ArtifactMetadata, String>>>>,
    calls: Arc<AtomicUsize>,
}

impl StubIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, file_name: &str, metadata: ArtifactMetadata) {
        self.known
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Ok(metadata));
    }

    /// Make loading `file_name` fail as corrupt.
    pub fn corrupt(&self, file_name: &str) {
        self.known
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Err("bad archive".to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ArtifactIntrospector for StubIntrospector {
    fn load(&self, _kind: ArtifactKind, file_name: &str) -> Result<ArtifactMetadata, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let path = PathBuf::from(file_name);
        match self.known.lock().unwrap().get(file_name) {
            Some(Ok(metadata)) => Ok(metadata.clone()),
            Some(Err(reason)) => Err(LoadError::Corrupt {
                path,
                reason: reason.clone(),
            }),
            None => Err(LoadError::NotFound { path }),
        }
    }
}

/// In-memory catalog whose `delete` fails for selected ids.
pub struct FlakyCatalog {
    inner: FileCatalog,
    failing_deletes: Mutex<HashSet<u64>>,
}

impl FlakyCatalog {
    pub fn new() -> Self {
        Self {
            inner: FileCatalog::in_memory(),
            failing_deletes: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_delete_of(&self, id: u64) {
        self.failing_deletes.lock().unwrap().insert(id);
    }
}

impl Catalog for FlakyCatalog {
    fn store<E: Entity>(&self, entity: &E) -> Result<u64, CatalogError> {
        self.inner.store(entity)
    }

    fn update<E: Entity>(&self, entity: &E) -> Result<(), CatalogError> {
        self.inner.update(entity)
    }

    fn delete<E: Entity>(&self, entity: &E) -> Result<(), CatalogError> {
        let failing = entity
            .id()
            .map(|id| self.failing_deletes.lock().unwrap().contains(&id))
            .unwrap_or(false);
        if failing {
            return Err(CatalogError::Io {
                path: PathBuf::from("flaky-catalog"),
                source: io::Error::new(io::ErrorKind::Other, "injected delete failure"),
            });
        }
        self.inner.delete(entity)
    }

    fn retrieve<E: Entity>(&self, id: u64) -> Result<Option<E>, CatalogError> {
        self.inner.retrieve(id)
    }

    fn query<E: Entity>(&self, predicates: &[Predicate]) -> Result<Vec<E>, CatalogError> {
        self.inner.query(predicates)
    }
}
