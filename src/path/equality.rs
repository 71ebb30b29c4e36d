use std::path::Path;

use serde::{Deserialize, Serialize};

/// Platform rule for comparing two resolved paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEquality {
    pub case_insensitive: bool,
}

impl PathEquality {
    pub fn new(case_insensitive: bool) -> Self {
        Self { case_insensitive }
    }

    /// Matches the host platform: case-insensitive on Windows only.
    pub fn platform() -> Self {
        Self::new(cfg!(windows))
    }

    /// Comparison key for `path`.
    pub fn key(&self, path: &Path) -> String {
        let text = path.to_string_lossy();
        if self.case_insensitive {
            text.to_lowercase()
        } else {
            text.into_owned()
        }
    }

    pub fn same(&self, a: &Path, b: &Path) -> bool {
        self.key(a) == self.key(b)
    }
}

impl Default for PathEquality {
    fn default() -> Self {
        Self::platform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_flag_decides_equality() {
        let upper = Path::new("/data/A.csv");
        let lower = Path::new("/data/a.csv");

        assert!(PathEquality::new(true).same(upper, lower));
        assert!(!PathEquality::new(false).same(upper, lower));
    }

    #[test]
    fn key_is_verbatim_when_case_sensitive() {
        assert_eq!(PathEquality::new(false).key(Path::new("/X/Y")), "/X/Y");
        assert_eq!(PathEquality::new(true).key(Path::new("/X/Y")), "/x/y");
    }
}
