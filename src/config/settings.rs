//! Typed view of the merged configuration.

use std::path::{Path, PathBuf};

use registry_catalog::ArtifactKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::effective::{ConfigError, ConfigSource, EffectiveConfig, EnvOverrides};
use crate::path::normalize_lexically;

/// Managed directories, one per kind of stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directories {
    pub algorithms: PathBuf,
    pub engines: PathBuf,
    pub inputs: PathBuf,
}

impl Directories {
    pub fn for_kind(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Algorithm => &self.algorithms,
            ArtifactKind::Engine => &self.engines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    pub deployment_marker: String,
    /// Root that paths containing the marker are re-anchored onto.
    #[serde(default)]
    pub deployment_root: Option<PathBuf>,
    /// Roots searched by leaf name. Empty means the inputs directory.
    #[serde(default)]
    pub search_roots: Vec<PathBuf>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    pub default_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: u64,
}

/// Resolved registry configuration. All paths are absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub working_root: PathBuf,
    pub directories: Directories,
    pub resolution: ResolutionConfig,
    pub catalog: CatalogConfig,
    pub preview: PreviewConfig,
    pub upload: UploadConfig,
    pub artifact_extensions: Vec<String>,
    pub input_extensions: Vec<String>,
    /// Engine file whose parameters are reported as the defaults.
    #[serde(default)]
    pub default_engine: Option<String>,
    /// Layers that produced this configuration.
    #[serde(default, skip_deserializing)]
    pub sources: Vec<ConfigSource>,
}

impl RegistryConfig {
    /// Build from every layer.
    pub fn load(
        config_file: Option<&Path>,
        env: &EnvOverrides,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let effective = EffectiveConfig::build(config_file, env, cli_overrides)?;
        Self::from_effective(&effective)
    }

    /// Built-in defaults anchored at `working_root`.
    pub fn rooted_at(working_root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let overrides = serde_json::json!({
            "working_root": working_root.as_ref().display().to_string()
        });
        Self::load(None, &EnvOverrides::default(), Some(overrides))
    }

    pub fn from_effective(effective: &EffectiveConfig) -> Result<Self, ConfigError> {
        let mut config: RegistryConfig = serde_json::from_value(effective.config.clone())?;
        config.sources = effective.sources.clone();
        config.absolutize()?;
        config.validate()?;
        Ok(config)
    }

    fn absolutize(&mut self) -> Result<(), ConfigError> {
        if self.working_root.is_relative() {
            let cwd = std::env::current_dir()
                .map_err(|e| ConfigError::Invalid(format!("no current directory: {}", e)))?;
            self.working_root = cwd.join(&self.working_root);
        }
        self.working_root = normalize_lexically(&self.working_root);

        let root = self.working_root.clone();
        let anchor = |path: &Path| normalize_lexically(&root.join(path));

        self.directories.algorithms = anchor(&self.directories.algorithms);
        self.directories.engines = anchor(&self.directories.engines);
        self.directories.inputs = anchor(&self.directories.inputs);
        self.catalog.path = anchor(&self.catalog.path);
        self.resolution.deployment_root = self.resolution.deployment_root.as_deref().map(anchor);

        self.resolution.search_roots = if self.resolution.search_roots.is_empty() {
            vec![self.directories.inputs.clone()]
        } else {
            self.resolution.search_roots.iter().map(|p| anchor(p)).collect()
        };

        for extensions in [&mut self.artifact_extensions, &mut self.input_extensions] {
            for ext in extensions.iter_mut() {
                *ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
            }
            extensions.retain(|ext| !ext.is_empty());
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.preview.default_rows == 0 {
            return Err(ConfigError::Invalid(
                "preview.default_rows must be greater than 0".to_string(),
            ));
        }
        if self.resolution.deployment_marker.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "resolution.deployment_marker must not be empty".to_string(),
            ));
        }
        if self.upload.max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "upload.max_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn accepts_artifact(&self, path: &Path) -> bool {
        has_extension(path, &self.artifact_extensions)
    }

    pub fn accepts_input(&self, path: &Path) -> bool {
        has_extension(path, &self.input_extensions)
    }
}

fn has_extension(path: &Path, accepted: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| accepted.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
