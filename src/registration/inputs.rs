//! Registration of data inputs.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use registry_catalog::{Catalog, Entity, Predicate, RegisteredInput};
use walkdir::WalkDir;

use super::Registration;
use crate::config::RegistryConfig;
use crate::duplicate::DuplicateDetector;
use crate::error::RegistryError;
use crate::path::PathResolver;
use crate::upload::FileWriter;

/// One named stream of a multi-file upload.
pub struct UploadPart<R> {
    pub name: String,
    pub reader: R,
}

impl<R: Read> UploadPart<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
        }
    }
}

/// Registration, update and listing of data inputs.
pub struct InputRegistrar<'a, C> {
    catalog: &'a C,
    writer: &'a dyn FileWriter,
    resolver: &'a PathResolver,
    config: &'a RegistryConfig,
}

impl<'a, C: Catalog> InputRegistrar<'a, C> {
    pub fn new(
        catalog: &'a C,
        writer: &'a dyn FileWriter,
        resolver: &'a PathResolver,
        config: &'a RegistryConfig,
    ) -> Self {
        Self {
            catalog,
            writer,
            resolver,
            config,
        }
    }

    fn input_dir(&self) -> PathBuf {
        self.resolver
            .resolve_directory(&self.config.directories.inputs.to_string_lossy())
    }

    fn detector<'d>(&'d self, input_dir: &'d Path) -> DuplicateDetector<'d> {
        DuplicateDetector::new(self.resolver, input_dir)
    }

    /// Store every named part in the input directory and register it.
    ///
    /// Parts with a blank name are skipped. A part whose file already existed
    /// and is already registered is reported as unchanged.
    pub fn upload<R: Read>(
        &self,
        parts: impl IntoIterator<Item = UploadPart<R>>,
    ) -> Result<Vec<Registration<RegisteredInput>>, RegistryError> {
        let dir = self.input_dir();
        let mut results = Vec::new();

        for mut part in parts {
            if part.name.trim().is_empty() {
                tracing::debug!("skipping upload part without a name");
                continue;
            }
            let outcome = self.writer.write_to_disk(&mut part.reader, &part.name, &dir)?;
            let stored = outcome
                .path
                .canonicalize()
                .unwrap_or(outcome.path)
                .display()
                .to_string();

            if outcome.already_existed {
                let snapshot = self.catalog.all::<RegisteredInput>()?;
                if let Some(existing) = self.detector(&dir).find_registered(&stored, &snapshot) {
                    results.push(Registration::Unchanged(existing.clone()));
                    continue;
                }
            }
            let input = RegisteredInput::new(stored).with_name(Some(part.name.clone()));
            results.push(self.upsert(input)?);
        }
        Ok(results)
    }

    /// Register a file by path. The stored `file_name` is the canonical
    /// path when the file resolves.
    pub fn register(
        &self,
        input: RegisteredInput,
    ) -> Result<Registration<RegisteredInput>, RegistryError> {
        if input.file_name.trim().is_empty() {
            return Err(RegistryError::validation("file_name", "must not be empty"));
        }

        let resolution = self.resolver.resolve_matching_case(&input.file_name);
        if !resolution.is_resolved() {
            tracing::warn!(file_name = %input.file_name, "registering unresolved input path");
        }
        let file_name = resolution.into_string();

        let dir = self.input_dir();
        let snapshot = self.catalog.all::<RegisteredInput>()?;
        if let Some(existing) = self.detector(&dir).find_registered(&file_name, &snapshot) {
            tracing::debug!(%file_name, "input already registered");
            return Ok(Registration::Unchanged(existing.clone()));
        }
        self.upsert(input.with_file_name(file_name))
    }

    /// Register a single file, or every accepted file directly inside a
    /// directory. Files that are already registered are left out of the result.
    pub fn register_directory(
        &self,
        path: &str,
    ) -> Result<Vec<Registration<RegisteredInput>>, RegistryError> {
        let target = self
            .resolver
            .resolve(path)
            .into_path()
            .ok_or_else(|| RegistryError::not_found("path", path))?;

        if target.is_file() {
            let registration = self.register(RegisteredInput::new(target.display().to_string()))?;
            return Ok(vec![registration]);
        }
        if !target.is_dir() {
            return Err(RegistryError::not_found("path", path));
        }

        let mut children: Vec<PathBuf> = fs::read_dir(&target)
            .map_err(|e| RegistryError::io(&target, e))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && self.config.accepts_input(p))
            .collect();
        children.sort();

        let mut registered = Vec::new();
        for child in children {
            let registration = self.register(RegisteredInput::new(child.display().to_string()))?;
            if !registration.is_unchanged() {
                registered.push(registration);
            }
        }
        tracing::info!(path = %target.display(), count = registered.len(), "registered directory");
        Ok(registered)
    }

    fn upsert(&self, input: RegisteredInput) -> Result<Registration<RegisteredInput>, RegistryError> {
        match self.catalog.store(&input) {
            Ok(id) => {
                tracing::info!(file_name = %input.file_name, id, "registered input");
                Ok(Registration::Created(input.with_id(id)))
            }
            Err(e) if e.is_unique_violation() => {
                let stored = self
                    .find(&input.file_name)?
                    .ok_or_else(|| RegistryError::not_found("input", &input.file_name))?;
                let merged = input.replacing(&stored);
                self.catalog.update(&merged)?;
                Ok(Registration::Updated(merged))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find(&self, file_name: &str) -> Result<Option<RegisteredInput>, RegistryError> {
        let found = self
            .catalog
            .query::<RegisteredInput>(&[Predicate::eq("file_name", file_name)])?;
        Ok(found.into_iter().next())
    }

    /// Replace a stored input. The id must name an existing record.
    pub fn update(&self, input: RegisteredInput) -> Result<RegisteredInput, RegistryError> {
        let id = input
            .id
            .ok_or_else(|| RegistryError::validation("id", "input has no id"))?;
        let stored = self
            .catalog
            .retrieve::<RegisteredInput>(id)?
            .ok_or_else(|| RegistryError::not_found("input", id))?;

        let updated = input.replacing(&stored);
        self.catalog.update(&updated)?;
        tracing::info!(id, file_name = %updated.file_name, "updated input");
        Ok(updated)
    }

    /// The stored record, with `file_name` pointing at the located file
    /// when there is one.
    pub fn get(&self, id: u64) -> Result<RegisteredInput, RegistryError> {
        let stored = self
            .catalog
            .retrieve::<RegisteredInput>(id)?
            .ok_or_else(|| RegistryError::not_found("input", id))?;

        match self.resolver.locate_stored(&stored.file_name, &self.input_dir()) {
            Some(path) => {
                let located = path.display().to_string();
                Ok(stored.with_file_name(located))
            }
            None => Ok(stored),
        }
    }

    pub fn list(&self) -> Result<Vec<RegisteredInput>, RegistryError> {
        Ok(self.catalog.all::<RegisteredInput>()?)
    }

    /// Accepted files anywhere under the input directory, sorted.
    pub fn available_files(&self) -> Result<Vec<PathBuf>, RegistryError> {
        let dir = self.input_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.clone());
                RegistryError::io(path, e.into())
            })?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if entry.file_type().is_file() && !hidden && self.config.accepts_input(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}
