//! Wiring of the registry components.

use registry_catalog::{Catalog, FileCatalog};

use crate::config::RegistryConfig;
use crate::deletion::DeletionCoordinator;
use crate::error::RegistryError;
use crate::introspect::{ArtifactIntrospector, DescriptorIntrospector};
use crate::path::PathResolver;
use crate::preview::PreviewReader;
use crate::registration::{ArtifactRegistrar, InputRegistrar};
use crate::upload::{FileWriter, ManagedWriter};

/// A catalog together with the collaborators that operate on it.
///
/// Components borrow from the registry per call; nothing is cached between
/// calls.
pub struct Registry<C> {
    config: RegistryConfig,
    resolver: PathResolver,
    catalog: C,
    introspector: Box<dyn ArtifactIntrospector>,
    writer: Box<dyn FileWriter>,
}

impl Registry<FileCatalog> {
    /// Open the configured catalog file with the default collaborators.
    pub fn open(config: RegistryConfig) -> Result<Self, RegistryError> {
        let catalog = FileCatalog::open(&config.catalog.path)?;
        tracing::debug!(catalog = %config.catalog.path.display(), "opened catalog");
        Ok(Self::with_catalog(config, catalog))
    }
}

impl<C: Catalog> Registry<C> {
    /// Default collaborators over an existing catalog.
    pub fn with_catalog(config: RegistryConfig, catalog: C) -> Self {
        let introspector = Box::new(DescriptorIntrospector::new(&config));
        let writer = Box::new(ManagedWriter::new(config.upload.max_bytes));
        Self {
            resolver: PathResolver::from_config(&config),
            config,
            catalog,
            introspector,
            writer,
        }
    }

    pub fn with_introspector(mut self, introspector: impl ArtifactIntrospector + 'static) -> Self {
        self.introspector = Box::new(introspector);
        self
    }

    pub fn with_writer(mut self, writer: impl FileWriter + 'static) -> Self {
        self.writer = Box::new(writer);
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn artifacts(&self) -> ArtifactRegistrar<'_, C> {
        ArtifactRegistrar::new(
            &self.catalog,
            self.introspector.as_ref(),
            self.writer.as_ref(),
            &self.resolver,
            &self.config,
        )
    }

    pub fn inputs(&self) -> InputRegistrar<'_, C> {
        InputRegistrar::new(&self.catalog, self.writer.as_ref(), &self.resolver, &self.config)
    }

    pub fn deletion(&self) -> DeletionCoordinator<'_, C> {
        DeletionCoordinator::new(&self.catalog, &self.resolver, &self.config)
    }

    pub fn preview(&self) -> PreviewReader<'_, C> {
        PreviewReader::new(&self.catalog, &self.resolver, &self.config)
    }
}
