//! Path resolution
//!
//! Turns stored or caller-supplied path strings into canonical filesystem
//! paths. Strings may be relative, percent-encoded, or carry a deployment
//! prefix from another host. Resolution never fails: when no strategy
//! matches, the caller gets the original string back.

mod equality;
mod normalize;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::config::RegistryConfig;

pub use equality::PathEquality;
pub use normalize::{normalize_lexically, pre_normalize};

/// Resolution strategies, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Re-anchor the part after the deployment marker onto the deployment root.
    DeploymentRoot,
    Absolute,
    /// Join onto the working root.
    WorkingRoot,
    /// Case-insensitive search by file name under the search roots.
    LeafSearch,
}

impl Strategy {
    pub const ORDER: [Strategy; 4] = [
        Self::DeploymentRoot,
        Self::Absolute,
        Self::WorkingRoot,
        Self::LeafSearch,
    ];
}

/// Outcome of [`PathResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved { path: PathBuf, strategy: Strategy },
    /// No strategy matched; holds the caller's string verbatim.
    Unresolved(String),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Resolved { path, .. } => Some(path),
            Self::Unresolved(_) => None,
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::Resolved { path, .. } => Some(path),
            Self::Unresolved(_) => None,
        }
    }

    /// The canonical path as a string, or the original input.
    pub fn into_string(self) -> String {
        match self {
            Self::Resolved { path, .. } => path.display().to_string(),
            Self::Unresolved(raw) => raw,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved { path, .. } => write!(f, "{}", path.display()),
            Self::Unresolved(raw) => f.write_str(raw),
        }
    }
}

/// Resolves path strings against the configured roots.
#[derive(Debug, Clone)]
pub struct PathResolver {
    working_root: PathBuf,
    deployment_marker: String,
    deployment_root: Option<PathBuf>,
    search_roots: Vec<PathBuf>,
    equality: PathEquality,
}

impl PathResolver {
    /// A resolver rooted at `working_root` with no deployment root and no
    /// search roots.
    pub fn new(working_root: impl Into<PathBuf>) -> Self {
        Self {
            working_root: working_root.into(),
            deployment_marker: "/WEB-INF/classes/".to_string(),
            deployment_root: None,
            search_roots: Vec::new(),
            equality: PathEquality::platform(),
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self {
            working_root: config.working_root.clone(),
            deployment_marker: config.resolution.deployment_marker.clone(),
            deployment_root: config.resolution.deployment_root.clone(),
            search_roots: config.resolution.search_roots.clone(),
            equality: PathEquality::new(config.resolution.case_insensitive),
        }
    }

    pub fn with_deployment_root(mut self, marker: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.deployment_marker = marker.into();
        self.deployment_root = Some(root.into());
        self
    }

    pub fn with_search_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.search_roots = roots;
        self
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.equality = PathEquality::new(case_insensitive);
        self
    }

    /// A copy whose leaf search only looks under `dir`.
    pub fn scoped_to(&self, dir: impl Into<PathBuf>) -> Self {
        Self {
            search_roots: vec![dir.into()],
            ..self.clone()
        }
    }

    pub fn working_root(&self) -> &Path {
        &self.working_root
    }

    pub fn equality(&self) -> PathEquality {
        self.equality
    }

    /// Resolve `raw` to a canonical path of an existing file or directory.
    ///
    /// The decoded form is tried first; when decoding changed the string,
    /// the raw form is tried as well so that names containing a literal `%`
    /// still resolve.
    pub fn resolve(&self, raw: &str) -> Resolution {
        self.resolve_with(raw, &Strategy::ORDER, PathEquality::new(true))
    }

    /// Like [`resolve`](Self::resolve), but a leaf search hit must match
    /// the requested file name under the configured case rule.
    pub fn resolve_matching_case(&self, raw: &str) -> Resolution {
        self.resolve_with(raw, &Strategy::ORDER, self.equality)
    }

    /// The canonical path `raw` names on disk, without searching by leaf.
    pub fn resolve_existing(&self, raw: &str) -> Option<PathBuf> {
        self.resolve_with(raw, &Strategy::ORDER[..3], self.equality)
            .into_path()
    }

    fn resolve_with(&self, raw: &str, strategies: &[Strategy], leaf_rule: PathEquality) -> Resolution {
        let decoded = pre_normalize(raw);
        let mut candidates = vec![decoded.as_str()];
        if decoded != raw {
            candidates.push(raw);
        }

        for candidate in candidates {
            for &strategy in strategies {
                if let Some(path) = self.attempt(strategy, candidate, leaf_rule) {
                    tracing::debug!(raw, ?strategy, path = %path.display(), "resolved path");
                    return Resolution::Resolved { path, strategy };
                }
            }
        }

        tracing::debug!(raw, "path did not resolve");
        Resolution::Unresolved(raw.to_string())
    }

    fn attempt(&self, strategy: Strategy, candidate: &str, leaf_rule: PathEquality) -> Option<PathBuf> {
        let found = match strategy {
            Strategy::DeploymentRoot => self.under_deployment_root(candidate),
            Strategy::Absolute => Some(PathBuf::from(candidate)).filter(|p| p.is_absolute()),
            Strategy::WorkingRoot => Some(PathBuf::from(candidate))
                .filter(|p| p.is_relative())
                .map(|p| self.working_root.join(p)),
            Strategy::LeafSearch => return self.search_leaf(candidate, leaf_rule),
        }?;
        canonical_if_exists(&found)
    }

    fn under_deployment_root(&self, candidate: &str) -> Option<PathBuf> {
        let root = self.deployment_root.as_ref()?;
        let marker = self.deployment_marker.replace('\\', "/");
        let unified = candidate.replace('\\', "/");
        let at = unified.find(&marker)?;
        let remainder = &unified[at + marker.len()..];
        Some(root.join(remainder))
    }

    fn search_leaf(&self, candidate: &str, rule: PathEquality) -> Option<PathBuf> {
        let leaf = Path::new(Path::new(candidate).file_name()?);

        self.search_roots.iter().find_map(|root| {
            WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .find(|entry| rule.same(Path::new(entry.file_name()), leaf))
                .and_then(|entry| canonical_if_exists(entry.path()))
        })
    }

    /// Make `raw` absolute against the working root and collapse `.`/`..`.
    /// The directory need not exist.
    pub fn resolve_directory(&self, raw: &str) -> PathBuf {
        let decoded = PathBuf::from(pre_normalize(raw));
        let absolute = if decoded.is_absolute() {
            decoded
        } else {
            self.working_root.join(decoded)
        };
        normalize_lexically(&absolute)
    }

    /// `file_name` joined onto `dir`, if that is a regular file.
    pub fn locate_in(&self, dir: &Path, file_name: &str) -> Option<PathBuf> {
        let candidate = normalize_lexically(&dir.join(pre_normalize(file_name)));
        candidate.is_file().then_some(candidate)
    }

    /// Locate a file stored in a managed directory: a direct join first,
    /// then full resolution with the leaf search confined to `dir`.
    pub fn locate_managed(&self, dir: &Path, file_name: &str) -> Option<PathBuf> {
        self.locate_in(dir, file_name).or_else(|| {
            self.scoped_to(dir)
                .resolve(file_name)
                .into_path()
                .filter(|p| p.is_file())
        })
    }

    /// Locate the file behind a stored path: the path itself if it still
    /// resolves to a file, else its leaf name under `managed_dir`.
    pub fn locate_stored(&self, stored: &str, managed_dir: &Path) -> Option<PathBuf> {
        if let Some(path) = self.resolve(stored).into_path().filter(|p| p.is_file()) {
            return Some(path);
        }
        let leaf = leaf_name(stored)?;
        self.locate_managed(managed_dir, &leaf)
    }
}

/// Last component of a stored path string, after decoding.
pub fn leaf_name(stored: &str) -> Option<String> {
    let decoded = pre_normalize(stored);
    let unified = decoded.replace('\\', "/");
    let leaf = unified.rsplit('/').next()?.trim();
    (!leaf.is_empty() && leaf != "." && leaf != "..").then(|| leaf.to_string())
}

fn canonical_if_exists(path: &Path) -> Option<PathBuf> {
    if !path.exists() {
        return None;
    }
    path.canonicalize().ok()
}
