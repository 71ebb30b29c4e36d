//! Catalog contract and the JSON-file backed implementation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, Predicate};
use crate::error::CatalogError;

/// Persistence boundary for registry entities.
///
/// The entity kind is selected by the type parameter. Implementations must
/// reject a `store` whose natural key is already taken with
/// [`CatalogError::UniqueViolation`]; registration relies on that to turn a
/// lost insert race into an update.
pub trait Catalog: Send + Sync {
    /// Persists a new record and returns its assigned id.
    fn store<E: Entity>(&self, entity: &E) -> Result<u64, CatalogError>;

    /// Replaces the record with the same id.
    fn update<E: Entity>(&self, entity: &E) -> Result<(), CatalogError>;

    /// Removes the record with the same id.
    fn delete<E: Entity>(&self, entity: &E) -> Result<(), CatalogError>;

    fn retrieve<E: Entity>(&self, id: u64) -> Result<Option<E>, CatalogError>;

    /// Records matching every predicate, ordered by id.
    fn query<E: Entity>(&self, predicates: &[Predicate]) -> Result<Vec<E>, CatalogError>;

    fn all<E: Entity>(&self) -> Result<Vec<E>, CatalogError> {
        self.query(&[])
    }
}

/// Schema version for the catalog file.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tables {
    schema_version: u32,
    next_id: u64,
    #[serde(default)]
    tables: BTreeMap<String, BTreeMap<u64, Value>>,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            next_id: 1,
            tables: BTreeMap::new(),
        }
    }
}

impl Tables {
    fn rows<E: Entity>(&self) -> Result<Vec<E>, CatalogError> {
        let Some(table) = self.tables.get(&E::KIND.to_string()) else {
            return Ok(Vec::new());
        };
        table
            .values()
            .map(|value| serde_json::from_value(value.clone()).map_err(CatalogError::from))
            .collect()
    }

    /// Whether a record other than `except` already owns `key`.
    fn key_taken<E: Entity>(&self, key: &str, except: Option<u64>) -> Result<bool, CatalogError> {
        Ok(self.rows::<E>()?.iter().any(|row| {
            row.id() != except && row.natural_key().as_deref() == Some(key)
        }))
    }

    fn table_mut<E: Entity>(&mut self) -> &mut BTreeMap<u64, Value> {
        self.tables.entry(E::KIND.to_string()).or_default()
    }
}

/// Catalog kept in memory and, when opened on a path, mirrored to a JSON
/// file after every mutation.
///
/// Mutations are serialized behind a mutex. Each one is applied to a copy
/// of the tables, persisted, and only then swapped in, so a failed write
/// leaves the in-memory state untouched.
#[derive(Debug)]
pub struct FileCatalog {
    path: Option<PathBuf>,
    tables: Mutex<Tables>,
}

impl FileCatalog {
    /// A catalog that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Opens the catalog file at `path`, starting empty when it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&content)?
        } else {
            Tables::default()
        };

        tracing::debug!(path = %path.display(), "opened catalog");
        Ok(Self {
            path: Some(path),
            tables: Mutex::new(tables),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn commit(&self, guard: &mut Tables, next: Tables) -> Result<(), CatalogError> {
        if let Some(path) = &self.path {
            write_atomic(path, &next)?;
        }
        *guard = next;
        Ok(())
    }
}

/// Writes the tables to a temp file next to `path`, then renames it over.
fn write_atomic(path: &Path, tables: &Tables) -> Result<(), CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(tables)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "catalog.json".to_string());
    let temp_path = path.with_file_name(format!(".{}.tmp.{}", file_name, std::process::id()));

    fs::write(&temp_path, json).map_err(io_err)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_err(e));
    }
    Ok(())
}

impl Catalog for FileCatalog {
    fn store<E: Entity>(&self, entity: &E) -> Result<u64, CatalogError> {
        let mut guard = self.lock();

        if let Some(key) = entity.natural_key() {
            if guard.key_taken::<E>(&key, None)? {
                return Err(CatalogError::UniqueViolation { kind: E::KIND, key });
            }
        }

        let mut next = guard.clone();
        let id = next.next_id;
        next.next_id += 1;
        let value = serde_json::to_value(entity.clone().with_id(id))?;
        next.table_mut::<E>().insert(id, value);

        self.commit(&mut guard, next)?;
        tracing::debug!(kind = %E::KIND, id, "stored record");
        Ok(id)
    }

    fn update<E: Entity>(&self, entity: &E) -> Result<(), CatalogError> {
        let id = entity.id().ok_or(CatalogError::MissingId { kind: E::KIND })?;
        let mut guard = self.lock();

        let exists = guard
            .tables
            .get(&E::KIND.to_string())
            .is_some_and(|table| table.contains_key(&id));
        if !exists {
            return Err(CatalogError::NotFound { kind: E::KIND, id });
        }
        if let Some(key) = entity.natural_key() {
            if guard.key_taken::<E>(&key, Some(id))? {
                return Err(CatalogError::UniqueViolation { kind: E::KIND, key });
            }
        }

        let mut next = guard.clone();
        next.table_mut::<E>().insert(id, serde_json::to_value(entity)?);

        self.commit(&mut guard, next)?;
        tracing::debug!(kind = %E::KIND, id, "updated record");
        Ok(())
    }

    fn delete<E: Entity>(&self, entity: &E) -> Result<(), CatalogError> {
        let id = entity.id().ok_or(CatalogError::MissingId { kind: E::KIND })?;
        let mut guard = self.lock();

        let mut next = guard.clone();
        if next.table_mut::<E>().remove(&id).is_none() {
            return Err(CatalogError::NotFound { kind: E::KIND, id });
        }

        self.commit(&mut guard, next)?;
        tracing::debug!(kind = %E::KIND, id, "deleted record");
        Ok(())
    }

    fn retrieve<E: Entity>(&self, id: u64) -> Result<Option<E>, CatalogError> {
        let guard = self.lock();
        guard
            .tables
            .get(&E::KIND.to_string())
            .and_then(|table| table.get(&id))
            .map(|value| serde_json::from_value(value.clone()).map_err(CatalogError::from))
            .transpose()
    }

    fn query<E: Entity>(&self, predicates: &[Predicate]) -> Result<Vec<E>, CatalogError> {
        let guard = self.lock();
        Ok(guard
            .rows::<E>()?
            .into_iter()
            .filter(|row| predicates.iter().all(|p| p.matches(row)))
            .collect())
    }
}
