//! Duplicate detection for data inputs.
//!
//! Two catalog entries can name the same physical file through different
//! strings: an absolute path on one host, a bare leaf name on another, a
//! percent-encoded form. Catalog entries are resolved with every strategy;
//! the candidate is canonicalized only when it names an existing file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use registry_catalog::RegisteredInput;

use crate::path::{leaf_name, PathResolver};

/// Matches a candidate path against a catalog snapshot.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateDetector<'a> {
    resolver: &'a PathResolver,
    input_root: &'a Path,
}

impl<'a> DuplicateDetector<'a> {
    pub fn new(resolver: &'a PathResolver, input_root: &'a Path) -> Self {
        Self {
            resolver,
            input_root,
        }
    }

    pub fn is_registered(&self, candidate: &str, snapshot: &[RegisteredInput]) -> bool {
        self.find_registered(candidate, snapshot).is_some()
    }

    /// The snapshot entry that refers to the same file as `candidate`.
    ///
    /// `candidate` is never matched by leaf name, so a missing `a.csv` is
    /// distinct from an existing `A.csv` unless the case rule says otherwise.
    pub fn find_registered<'s>(
        &self,
        candidate: &str,
        snapshot: &'s [RegisteredInput],
    ) -> Option<&'s RegisteredInput> {
        let equality = self.resolver.equality();
        let wanted = match self.resolver.resolve_existing(candidate) {
            Some(path) => equality.key(&path),
            None => equality.key(Path::new(candidate)),
        };

        let working_set = self.working_set(snapshot);
        working_set.get(&wanted).map(|&index| &snapshot[index])
    }

    /// Comparison key of every existing file the snapshot refers to,
    /// mapped to the first entry that refers to it.
    fn working_set(&self, snapshot: &[RegisteredInput]) -> HashMap<String, usize> {
        let equality = self.resolver.equality();
        let mut set = HashMap::new();

        for (index, entry) in snapshot.iter().enumerate() {
            for path in self.physical_paths(&entry.file_name) {
                set.entry(equality.key(&path)).or_insert(index);
            }
        }
        set
    }

    fn physical_paths(&self, stored: &str) -> Vec<PathBuf> {
        let direct = self.resolver.resolve(stored).into_path();
        let by_leaf = leaf_name(stored)
            .and_then(|leaf| self.resolver.locate_in(self.input_root, &leaf))
            .and_then(|path| path.canonicalize().ok());

        direct
            .into_iter()
            .chain(by_leaf)
            .filter(|path| path.is_file())
            .collect()
    }
}
