//! Ledger of paths that already have a watcher.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Paths for which a watcher has been started.
///
/// Paths are only ever added. A path stays in the set after its watcher fails
/// or its file disappears, so a discovery pass never attaches it twice.
#[derive(Debug, Default)]
pub struct WatchedSet {
    paths: HashSet<PathBuf>,
}

impl WatchedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `path` as watched. Returns `false` if it already was.
    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.paths.contains(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
