//! Version-control access for the commit driver.

pub mod diff;
pub mod repo;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::GitError;

pub use diff::{DiffMap, MAX_FILE_DIFF_LENGTH, MAX_TOTAL_DIFF_LENGTH, staged_diff};
pub use repo::GitRepository;

/// One commit in the journal history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    pub id: String,
    pub time: DateTime<Utc>,
    pub message: String,
}

impl JournalEntry {
    pub fn short_id(&self) -> &str {
        self.id.get(..7).unwrap_or(&self.id)
    }
}

/// Repository operations needed by a commit cycle.
///
/// Paths passed to [`Vcs::stage`] are relative to [`Vcs::workdir`] and use
/// forward slashes.
#[cfg_attr(test, mockall::automock)]
pub trait Vcs: Send {
    /// Working directory of the repository.
    fn workdir(&self) -> PathBuf;

    /// Stage `paths`: existing files are added, missing ones removed.
    fn stage(&mut self, paths: &[String]) -> Result<(), GitError>;

    /// Whether the index differs from HEAD.
    fn has_staged_changes(&self) -> Result<bool, GitError>;

    /// Per-file diff of the staged changes against HEAD.
    fn staged_diff(&self) -> Result<DiffMap, GitError>;

    /// Commit the index, returning the new commit id.
    ///
    /// Fails with [`GitError::NothingToCommit`] when the index matches HEAD.
    fn commit(&mut self, message: &str) -> Result<String, GitError>;

    /// Message of the HEAD commit, if any.
    fn last_message(&self) -> Result<Option<String>, GitError>;

    /// Up to `limit` most recent commits, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>, GitError>;
}
