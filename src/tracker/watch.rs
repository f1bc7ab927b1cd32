//! Filesystem watching with debouncing.
//!
//! Uses `notify-debouncer-mini` so bursts of saves collapse into one event
//! per path. The watcher thread never touches the changed-file set; it only
//! forwards accepted paths over a channel to the scheduler.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, DebouncedEventKind, Debouncer, new_debouncer};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info};

use crate::error::TrackerError;
use crate::tracker::rules::IgnoreRules;

/// A file under `root` was created, modified or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub root: PathBuf,
    pub path: PathBuf,
}

/// Live watcher for one workspace root. Dropping it stops the watch.
pub struct WorkspaceWatcher {
    root: PathBuf,
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl WorkspaceWatcher {
    /// Start watching `rules.root()` recursively.
    pub fn start(
        rules: IgnoreRules,
        debounce: Duration,
        tx: UnboundedSender<FileEvent>,
    ) -> Result<Self, TrackerError> {
        let root = rules.root().to_path_buf();
        let event_root = root.clone();

        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    for event in events {
                        if !matches!(event.kind, DebouncedEventKind::Any) {
                            continue;
                        }
                        let Some(path) = accept_path(&rules, event.path) else {
                            continue;
                        };
                        debug!(path = %path.display(), "File change detected");
                        let file_event = FileEvent {
                            root: event_root.clone(),
                            path,
                        };
                        if tx.send(file_event).is_err() {
                            debug!("Change receiver dropped, discarding event");
                        }
                    }
                }
                Err(e) => error!(error = %e, "File watch error"),
            }
        })
        .map_err(|source| TrackerError::WatchFailed {
            path: root.clone(),
            source,
        })?;

        debouncer
            .watcher()
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|source| TrackerError::WatchFailed {
                path: root.clone(),
                source,
            })?;

        info!(
            root = %root.display(),
            debounce_ms = debounce.as_millis() as u64,
            "File watcher started"
        );

        Ok(Self {
            root,
            _debouncer: debouncer,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Decide whether a raw watcher path belongs in the changed-file set.
///
/// Directories are dropped (their files produce their own events). Paths that
/// no longer exist are kept so removals reach the journal.
pub(crate) fn accept_path(rules: &IgnoreRules, path: PathBuf) -> Option<PathBuf> {
    if path.is_dir() {
        return None;
    }
    if rules.is_ignored(&path, false) {
        return None;
    }
    Some(path)
}
