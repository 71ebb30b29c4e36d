//! Merged configuration with provenance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;

pub const SCHEMA_VERSION: u32 = 1;

/// Overrides the working root.
pub const ENV_HOME: &str = "ARTIFACT_REGISTRY_HOME";

/// Overrides the catalog file.
pub const ENV_CATALOG: &str = "ARTIFACT_REGISTRY_CATALOG";

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Env,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ConfigSource {
    fn unfiled(origin: ConfigOrigin) -> Self {
        Self {
            origin,
            path: None,
            digest: None,
        }
    }
}

/// Environment variables that take part in the merge.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub home: Option<String>,
    pub catalog: Option<String>,
}

impl EnvOverrides {
    /// Reads the process environment. Empty values are ignored.
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            home: read(ENV_HOME),
            catalog: read(ENV_CATALOG),
        }
    }

    fn to_value(&self) -> Option<Value> {
        if self.home.is_none() && self.catalog.is_none() {
            return None;
        }
        let mut layer = serde_json::Map::new();
        if let Some(home) = &self.home {
            layer.insert("working_root".to_string(), Value::String(home.clone()));
        }
        if let Some(catalog) = &self.catalog {
            layer.insert("catalog".to_string(), serde_json::json!({ "path": catalog }));
        }
        Some(Value::Object(layer))
    }
}

/// The merged configuration object plus where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,

    pub created_at: DateTime<Utc>,

    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Merge defaults, an optional config file, environment and CLI overrides.
    ///
    /// A config file that is named but missing is an error.
    pub fn build(
        config_file: Option<&Path>,
        env: &EnvOverrides,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource::unfiled(ConfigOrigin::Builtin)];

        if let Some(path) = config_file {
            let (value, digest) = Self::load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.display().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(value) = env.to_value() {
            layers.push(value);
            sources.push(ConfigSource::unfiled(ConfigOrigin::Env));
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource::unfiled(ConfigOrigin::Cli));
        }

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            created_at: Utc::now(),
            config: merge_layers(layers),
            sources,
        })
    }

    /// Parse a TOML file, returning the value and the digest of its bytes.
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let digest = hex::encode(Sha256::digest(&bytes));

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::Invalid(format!("{} is not UTF-8: {}", path.display(), e)))?;
        let table: toml::Table = toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        Ok((serde_json::to_value(table)?, digest))
    }

    /// Look up a dot-separated key.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.config, |current, part| current.get(part))
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config has the wrong shape: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
