//! Change tracking: which files changed since the last commit cycle.

pub mod changes;
pub mod rules;
pub mod scan;
pub mod status;
pub mod watch;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::TrackingMode;
use crate::error::TrackerError;

pub use changes::{ChangeKind, ChangedFiles, FileChange};
pub use rules::{DEFAULT_IGNORES, IgnoreRules};
pub use scan::rescan;
pub use status::{changed_paths, status_changes};
pub use watch::{FileEvent, WorkspaceWatcher};

/// Tracking strategy for one workspace root.
#[derive(Debug, Clone)]
pub struct WorkspaceTracker {
    mode: TrackingMode,
    rules: IgnoreRules,
    /// Shadow repository root, when journaling into a shadow copy.
    shadow_root: Option<PathBuf>,
}

impl WorkspaceTracker {
    pub fn new(mode: TrackingMode, rules: IgnoreRules, shadow_root: Option<PathBuf>) -> Self {
        Self {
            mode,
            rules,
            shadow_root,
        }
    }

    pub fn root(&self) -> &Path {
        self.rules.root()
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn rules(&self) -> &IgnoreRules {
        &self.rules
    }

    /// Bring the changed-file set up to date before a cycle.
    ///
    /// Status tracking replaces the root's set with the repository status.
    /// Watch tracking is fed continuously by [`WorkspaceWatcher`] events, so
    /// there is nothing to do.
    pub fn refresh(&self, changed: &mut ChangedFiles) -> Result<(), TrackerError> {
        match self.mode {
            TrackingMode::Status => {
                let paths = changed_paths(self.root(), &self.rules)?;
                debug!(root = %self.root().display(), files = paths.len(), "Status refreshed");
                changed.replace(self.root(), paths);
                Ok(())
            }
            TrackingMode::Watch => Ok(()),
        }
    }

    /// Populate the changed-file set without any watcher history.
    ///
    /// Used by the one-shot manual trigger. Watch tracking compares the
    /// workspace with its shadow copy; without a shadow copy it falls back
    /// to repository status.
    pub fn scan(&self, changed: &mut ChangedFiles) -> Result<(), TrackerError> {
        match (self.mode, &self.shadow_root) {
            (TrackingMode::Watch, Some(shadow_root)) => {
                let paths = rescan(self.root(), shadow_root, &self.rules);
                for path in paths {
                    changed.record(self.root(), path);
                }
                Ok(())
            }
            _ => {
                let paths = changed_paths(self.root(), &self.rules)?;
                for path in paths {
                    changed.record(self.root(), path);
                }
                Ok(())
            }
        }
    }

    /// Record a watcher event if it belongs to this root.
    pub fn accept(&self, changed: &mut ChangedFiles, event: FileEvent) -> bool {
        if event.root != self.root() {
            return false;
        }
        changed.record(self.root(), event.path)
    }
}
