//! The changed-file set shared between trackers and the commit driver.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of change reported by the status tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed { from: PathBuf },
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "Added"),
            ChangeKind::Modified => write!(f, "Modified"),
            ChangeKind::Deleted => write!(f, "Deleted"),
            ChangeKind::Renamed { from } => write!(f, "Renamed from {}", from.display()),
        }
    }
}

/// A changed file, relative to its workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Files modified since the last commit cycle, keyed by workspace root.
///
/// Paths are stored absolute. A path appears at most once per root.
#[derive(Debug, Default)]
pub struct ChangedFiles {
    roots: HashMap<PathBuf, BTreeSet<PathBuf>>,
}

impl ChangedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a changed path. Returns `false` if it was already pending.
    pub fn record(&mut self, root: &Path, path: PathBuf) -> bool {
        self.roots.entry(root.to_path_buf()).or_default().insert(path)
    }

    /// Replace the pending set for `root`.
    pub fn replace<I>(&mut self, root: &Path, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let set: BTreeSet<PathBuf> = paths.into_iter().collect();
        self.roots.insert(root.to_path_buf(), set);
    }

    /// Pending paths for `root`, sorted.
    pub fn pending(&self, root: &Path) -> Vec<PathBuf> {
        self.roots
            .get(root)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, root: &Path) -> usize {
        self.roots.get(root).map_or(0, BTreeSet::len)
    }

    pub fn is_empty(&self, root: &Path) -> bool {
        self.len(root) == 0
    }

    pub fn clear(&mut self, root: &Path) {
        if let Some(set) = self.roots.get_mut(root) {
            set.clear();
        }
    }

    /// Number of pending paths across all roots.
    pub fn total(&self) -> usize {
        self.roots.values().map(BTreeSet::len).sum()
    }
}
