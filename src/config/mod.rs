//! Layered registry configuration
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. Config file (registry.toml)
//! 3. Environment (ARTIFACT_REGISTRY_HOME, ARTIFACT_REGISTRY_CATALOG)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;
mod settings;

pub use defaults::BuiltinDefaults;
pub use effective::{
    ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, EnvOverrides, ENV_CATALOG, ENV_HOME,
};
pub use merge::{deep_merge, merge_layers};
pub use settings::{
    CatalogConfig, Directories, PreviewConfig, RegistryConfig, ResolutionConfig, UploadConfig,
};
