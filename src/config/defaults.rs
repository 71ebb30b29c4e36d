//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Default upload cap: 512 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 512 * 1024 * 1024;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Root that relative paths resolve against (default: current directory)
    pub working_root: String,

    /// Managed directory names, relative to the working root
    pub algorithms_dir: String,
    pub engines_dir: String,
    pub inputs_dir: String,

    /// Segment that marks a deployment-classes path (default: "/WEB-INF/classes/")
    pub deployment_marker: String,

    /// Compare paths case-insensitively (default: on Windows only)
    pub case_insensitive: bool,

    /// Catalog file, relative to the working root
    pub catalog_path: String,

    /// Rows returned by a preview when the caller asks for none (default: 50)
    pub preview_rows: usize,

    pub max_upload_bytes: u64,

    pub artifact_extensions: Vec<String>,
    pub input_extensions: Vec<String>,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            working_root: ".".to_string(),
            algorithms_dir: "algorithms".to_string(),
            engines_dir: "engines".to_string(),
            inputs_dir: "inputs".to_string(),
            deployment_marker: "/WEB-INF/classes/".to_string(),
            case_insensitive: cfg!(windows),
            catalog_path: "catalog.json".to_string(),
            preview_rows: 50,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            artifact_extensions: vec!["jar".to_string()],
            input_extensions: ["csv", "tsv", "txt", "dat", "nt"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "working_root": self.working_root,
            "directories": {
                "algorithms": self.algorithms_dir,
                "engines": self.engines_dir,
                "inputs": self.inputs_dir
            },
            "resolution": {
                "deployment_marker": self.deployment_marker,
                "deployment_root": null,
                "search_roots": [],
                "case_insensitive": self.case_insensitive
            },
            "catalog": {
                "path": self.catalog_path
            },
            "preview": {
                "default_rows": self.preview_rows
            },
            "upload": {
                "max_bytes": self.max_upload_bytes
            },
            "artifact_extensions": self.artifact_extensions,
            "input_extensions": self.input_extensions
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.preview_rows, 50);
        assert_eq!(defaults.deployment_marker, "/WEB-INF/classes/");
        assert_eq!(defaults.artifact_extensions, vec!["jar"]);
        assert_eq!(defaults.case_insensitive, cfg!(windows));
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();

        assert_eq!(value["directories"]["algorithms"], "algorithms");
        assert_eq!(value["preview"]["default_rows"], 50);
        assert!(value["resolution"]["deployment_root"].is_null());
        assert_eq!(value["input_extensions"].as_array().unwrap().len(), 5);
    }
}
