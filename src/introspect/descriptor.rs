//! Sidecar descriptor introspector.
//!
//! An artifact `hyfd.jar` is described by `hyfd.jar.toml` next to it:
//!
//! ```toml
//! interface_version = 1
//! name = "HyFD"
//! authors = "T. Papenbrock"
//! capabilities = ["fd", "relational_input"]
//!
//! [[parameters]]
//! name = "max_lhs"
//! type = "integer"
//! default = 3
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use registry_catalog::ArtifactKind;
use serde::Deserialize;

use super::{ArtifactIntrospector, ArtifactMetadata, LoadError, ParameterSpec};
use crate::config::{Directories, RegistryConfig};
use crate::path::PathResolver;

/// Descriptor interface this introspector understands.
pub const INTERFACE_VERSION: i64 = 1;

/// Appended to the artifact file name to find its descriptor.
pub const DESCRIPTOR_EXTENSION: &str = "toml";

#[derive(Debug, Deserialize)]
struct Descriptor {
    name: Option<String>,
    authors: Option<String>,
    description: Option<String>,
    #[serde(default)]
    capabilities: Vec<String>,
    implementation_title: Option<String>,
    implementation_version: Option<String>,
    #[serde(default)]
    parameters: Vec<ParameterSpec>,
}

/// Reads `<artifact>.toml` descriptors from the managed directories.
#[derive(Debug, Clone)]
pub struct DescriptorIntrospector {
    directories: Directories,
    resolver: PathResolver,
}

impl DescriptorIntrospector {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            directories: config.directories.clone(),
            resolver: PathResolver::from_config(config),
        }
    }

    fn artifact_path(&self, kind: ArtifactKind, file_name: &str) -> Result<PathBuf, LoadError> {
        let dir = self.directories.for_kind(kind);
        self.resolver
            .locate_managed(dir, file_name)
            .ok_or_else(|| LoadError::NotFound {
                path: dir.join(file_name),
            })
    }

    fn read_descriptor(artifact: &Path) -> Result<Descriptor, LoadError> {
        let mut descriptor_path = artifact.as_os_str().to_owned();
        descriptor_path.push(".");
        descriptor_path.push(DESCRIPTOR_EXTENSION);
        let descriptor_path = PathBuf::from(descriptor_path);

        let incompatible = |reason: String| LoadError::IncompatibleInterface {
            path: artifact.to_path_buf(),
            reason,
        };
        let corrupt = |reason: String| LoadError::Corrupt {
            path: artifact.to_path_buf(),
            reason,
        };

        let text = match fs::read_to_string(&descriptor_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(incompatible(format!(
                    "no descriptor at {}",
                    descriptor_path.display()
                )))
            }
            Err(e) => return Err(corrupt(format!("unreadable descriptor: {}", e))),
        };

        let table: toml::Table = toml::from_str(&text).map_err(|e| corrupt(e.to_string()))?;

        match table.get("interface_version").and_then(toml::Value::as_integer) {
            Some(INTERFACE_VERSION) => {}
            Some(other) => {
                return Err(incompatible(format!(
                    "interface version {} (expected {})",
                    other, INTERFACE_VERSION
                )))
            }
            None => return Err(incompatible("missing interface_version".to_string())),
        }

        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| corrupt(e.to_string()))
    }
}

impl ArtifactIntrospector for DescriptorIntrospector {
    fn load(&self, kind: ArtifactKind, file_name: &str) -> Result<ArtifactMetadata, LoadError> {
        let artifact = self.artifact_path(kind, file_name)?;

        let size = fs::metadata(&artifact)
            .map_err(|e| LoadError::Corrupt {
                path: artifact.clone(),
                reason: e.to_string(),
            })?
            .len();
        if size == 0 {
            return Err(LoadError::Corrupt {
                path: artifact,
                reason: "file is empty".to_string(),
            });
        }

        let descriptor = Self::read_descriptor(&artifact)?;
        tracing::debug!(%kind, file_name, "loaded artifact descriptor");

        Ok(ArtifactMetadata {
            name: descriptor.name,
            authors: descriptor.authors,
            description: descriptor.description,
            capability_tags: descriptor.capabilities,
            implementation_title: descriptor.implementation_title,
            implementation_version: descriptor.implementation_version,
            parameters: descriptor.parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DescriptorIntrospector) {
        let dir = TempDir::new().unwrap();
        let config = RegistryConfig::rooted_at(dir.path()).unwrap();
        fs::create_dir_all(&config.directories.algorithms).unwrap();
        let introspector = DescriptorIntrospector::new(&config);
        (dir, introspector)
    }

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join("algorithms").join(name), contents).unwrap();
    }

    #[test]
    fn reads_descriptor_fields() {
        let (dir, introspector) = setup();
        write(&dir, "hyfd.jar", "PK");
        write(
            &dir,
            "hyfd.jar.toml",
            r#"
interface_version = 1
name = "HyFD"
authors = "Papenbrock"
description = "Hybrid FD discovery"
capabilities = ["fd", "relational_input"]
implementation_title = "hyfd"
implementation_version = "1.2"
"#,
        );

        let metadata = introspector.load(ArtifactKind::Algorithm, "hyfd.jar").unwrap();
        assert_eq!(metadata.name.as_deref(), Some("HyFD"));
        assert_eq!(metadata.capability_tags, vec!["fd", "relational_input"]);
        assert_eq!(metadata.implementation_version.as_deref(), Some("1.2"));
        assert!(metadata.parameters.is_empty());
    }

    #[test]
    fn reads_declared_parameters() {
        let (dir, introspector) = setup();
        write(&dir, "tane.jar", "PK");
        write(
            &dir,
            "tane.jar.toml",
            r#"
interface_version = 1
name = "TANE"

[[parameters]]
name = "max_lhs"
type = "integer"
default = 3
description = "Largest left-hand side"

[[parameters]]
name = "input"
type = "relational_input"
required = true
"#,
        );

        let metadata = introspector.load(ArtifactKind::Algorithm, "tane.jar").unwrap();
        let names: Vec<_> = metadata.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["max_lhs", "input"]);
        assert_eq!(metadata.parameters[0].value_type, "integer");
        assert_eq!(metadata.parameters[0].default_value, Some(serde_json::json!(3)));
        assert!(!metadata.parameters[0].required);
        assert!(metadata.parameters[1].required);
        assert_eq!(metadata.parameters[1].description, None);
    }

    #[test]
    fn parameter_without_type_is_corrupt() {
        let (dir, introspector) = setup();
        write(&dir, "odd.jar", "PK");
        write(
            &dir,
            "odd.jar.toml",
            "interface_version = 1\n[[parameters]]\nname = \"x\"\n",
        );

        let err = introspector.load(ArtifactKind::Algorithm, "odd.jar").unwrap_err();
        assert!(matches!(err, LoadError::Corrupt { .. }));
    }

    #[test]
    fn missing_artifact_is_not_found() {
        let (_dir, introspector) = setup();
        let err = introspector.load(ArtifactKind::Algorithm, "ghost.jar").unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn empty_artifact_is_corrupt() {
        let (dir, introspector) = setup();
        write(&dir, "empty.jar", "");
        write(&dir, "empty.jar.toml", "interface_version = 1\n");

        let err = introspector.load(ArtifactKind::Algorithm, "empty.jar").unwrap_err();
        assert!(matches!(err, LoadError::Corrupt { .. }));
    }

    #[test]
    fn malformed_descriptor_is_corrupt() {
        let (dir, introspector) = setup();
        write(&dir, "bad.jar", "PK");
        write(&dir, "bad.jar.toml", "interface_version = [");

        let err = introspector.load(ArtifactKind::Algorithm, "bad.jar").unwrap_err();
        assert!(matches!(err, LoadError::Corrupt { .. }));
    }

    #[test]
    fn missing_descriptor_or_wrong_version_is_incompatible() {
        let (dir, introspector) = setup();
        write(&dir, "plain.jar", "PK");
        let err = introspector.load(ArtifactKind::Algorithm, "plain.jar").unwrap_err();
        assert!(matches!(err, LoadError::IncompatibleInterface { .. }));

        write(&dir, "old.jar", "PK");
        write(&dir, "old.jar.toml", "interface_version = 0\nname = \"Old\"\n");
        let err = introspector.load(ArtifactKind::Algorithm, "old.jar").unwrap_err();
        assert!(matches!(err, LoadError::IncompatibleInterface { .. }));
    }
}
