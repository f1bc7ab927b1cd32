//! Mirror changed workspace files into the shadow directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::SnapshotError;

/// Result of mirroring one changed-file set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    /// Relative paths copied into the shadow directory.
    pub copied: Vec<String>,
    /// Relative paths removed from the shadow directory.
    pub removed: Vec<String>,
    /// Relative paths that could not be mirrored.
    pub skipped: Vec<String>,
}

impl SnapshotReport {
    /// Every path that changed in the shadow repository, for staging.
    pub fn staged_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .copied
            .iter()
            .chain(self.removed.iter())
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

/// Copies files from a workspace into `<workspace>/<shadow_dir>`.
#[derive(Debug, Clone)]
pub struct ShadowSnapshot {
    workspace_root: PathBuf,
    shadow_root: PathBuf,
}

impl ShadowSnapshot {
    pub fn new(workspace_root: impl Into<PathBuf>, shadow_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            shadow_root: shadow_root.into(),
        }
    }

    pub fn shadow_root(&self) -> &Path {
        &self.shadow_root
    }

    /// Ensure the shadow directory exists.
    pub fn prepare(&self) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.shadow_root).map_err(|source| SnapshotError::CreateDirFailed {
            path: self.shadow_root.clone(),
            source,
        })
    }

    /// Mirror `paths` (absolute, under the workspace root).
    ///
    /// Existing files are copied, missing files are removed from the shadow
    /// copy. Per-file failures are logged and reported as skipped so one bad
    /// file never blocks the rest of the cycle.
    pub fn mirror(&self, paths: &[PathBuf]) -> Result<SnapshotReport, SnapshotError> {
        self.prepare()?;

        let mut report = SnapshotReport::default();
        for path in paths {
            let relative = match self.relative(path) {
                Ok(relative) => relative,
                Err(e) => {
                    warn!("{}", e);
                    report.skipped.push(path.display().to_string());
                    continue;
                }
            };
            let key = to_repo_path(&relative);

            if path.is_file() {
                match self.copy_one(path, &relative) {
                    Ok(()) => report.copied.push(key),
                    Err(e) => {
                        warn!("Skipping {}: {}", key, e);
                        report.skipped.push(key);
                    }
                }
            } else if path.exists() {
                debug!("Skipping non-file path {}", key);
                report.skipped.push(key);
            } else {
                match self.remove_one(&relative) {
                    Ok(true) => report.removed.push(key),
                    Ok(false) => debug!("{} never reached the shadow copy", key),
                    Err(e) => {
                        warn!("Skipping {}: {}", key, e);
                        report.skipped.push(key);
                    }
                }
            }
        }

        Ok(report)
    }

    fn relative(&self, path: &Path) -> Result<PathBuf, SnapshotError> {
        let relative = path
            .strip_prefix(&self.workspace_root)
            .map_err(|_| SnapshotError::OutsideWorkspace(path.to_path_buf()))?;
        if path.starts_with(&self.shadow_root) {
            return Err(SnapshotError::InsideShadow(path.to_path_buf()));
        }
        Ok(relative.to_path_buf())
    }

    fn copy_one(&self, from: &Path, relative: &Path) -> Result<(), SnapshotError> {
        let to = self.shadow_root.join(relative);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|source| SnapshotError::CreateDirFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(from, &to).map_err(|source| SnapshotError::CopyFailed {
            from: from.to_path_buf(),
            to: to.clone(),
            source,
        })?;
        Ok(())
    }

    /// Returns `Ok(false)` if there was nothing to remove.
    fn remove_one(&self, relative: &Path) -> Result<bool, SnapshotError> {
        let target = self.shadow_root.join(relative);
        let result = if target.is_dir() {
            fs::remove_dir_all(&target)
        } else if target.exists() {
            fs::remove_file(&target)
        } else {
            return Ok(false);
        };
        result.map_err(|source| SnapshotError::RemoveFailed {
            path: target,
            source,
        })?;
        Ok(true)
    }
}

/// Forward-slash relative path, as git expects it.
pub fn to_repo_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
