//! One commit cycle: collect, stage, generate, commit.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::error::{CommitError, GitError};
use crate::message::{MessageGenerator, MessageSource, PromptInput, TextGenerator};
use crate::snapshot::{ShadowSnapshot, to_repo_path};
use crate::tracker::ChangedFiles;
use crate::vcs::Vcs;

/// How changed files reach the repository index.
#[derive(Debug, Clone)]
pub enum Staging {
    /// Copy into a shadow directory that is its own repository.
    Shadow(ShadowSnapshot),
    /// Stage directly in the workspace repository.
    InPlace,
}

/// Driver state, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Collecting,
    Committing,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverState::Idle => f.write_str("idle"),
            DriverState::Collecting => f.write_str("collecting"),
            DriverState::Committing => f.write_str("committing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    pub use_diffs: bool,
    pub include_previous_message: bool,
    pub interval_minutes: u64,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            use_diffs: false,
            include_previous_message: true,
            interval_minutes: 1,
        }
    }
}

/// A commit made by a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: String,
    pub timestamp: String,
    pub message: String,
    /// Repository-relative paths that were staged.
    pub files: Vec<String>,
    pub source: MessageSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was committed.
    Idle,
    Committed(CommitRecord),
}

/// Full journal message: `<timestamp> - <message>`.
pub fn format_commit_message(timestamp: &str, message: &str) -> String {
    format!("{} - {}", timestamp, message)
}

/// Current UTC time in RFC 3339 with milliseconds, e.g. `2024-05-01T10:30:00.000Z`.
pub fn commit_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Commits the changed files of one workspace root.
pub struct CommitDriver<V, G> {
    root: PathBuf,
    staging: Staging,
    vcs: V,
    generator: Arc<MessageGenerator<G>>,
    options: DriverOptions,
    state: DriverState,
}

impl<V: Vcs, G: TextGenerator> CommitDriver<V, G> {
    pub fn new(
        root: impl Into<PathBuf>,
        staging: Staging,
        vcs: V,
        generator: Arc<MessageGenerator<G>>,
        options: DriverOptions,
    ) -> Self {
        Self {
            root: root.into(),
            staging,
            vcs,
            generator,
            options,
            state: DriverState::Idle,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Run one cycle for this root.
    ///
    /// The root's changed-file set is cleared afterwards whether or not the
    /// commit succeeded.
    pub async fn run_cycle(
        &mut self,
        changed: &mut ChangedFiles,
    ) -> Result<CycleOutcome, CommitError> {
        let pending = changed.pending(&self.root);
        if pending.is_empty() {
            debug!(root = %self.root.display(), "No changes, skipping cycle");
            return Ok(CycleOutcome::Idle);
        }

        let result = self.commit_pending(&pending).await;
        changed.clear(&self.root);
        self.state = DriverState::Idle;
        result
    }

    async fn commit_pending(&mut self, pending: &[PathBuf]) -> Result<CycleOutcome, CommitError> {
        // The journal records when the cycle started, not when generation ended
        let timestamp = commit_timestamp();
        self.state = DriverState::Collecting;
        let files = self.collect(pending)?;
        if files.is_empty() {
            debug!(root = %self.root.display(), "Nothing collected");
            return Ok(CycleOutcome::Idle);
        }

        self.vcs.stage(&files)?;
        if !self.vcs.has_staged_changes()? {
            debug!(root = %self.root.display(), "Staged tree matches HEAD");
            return Ok(CycleOutcome::Idle);
        }

        let diffs = if self.options.use_diffs {
            self.vcs
                .staged_diff()
                .inspect_err(|e| warn!("Could not read diffs, sending file names: {}", e))
                .ok()
        } else {
            None
        };
        let previous = if self.options.include_previous_message {
            self.vcs
                .last_message()
                .inspect_err(|e| warn!("Could not read previous message: {}", e))
                .ok()
                .flatten()
        } else {
            None
        };

        self.state = DriverState::Committing;
        let message = self
            .generator
            .generate(
                &PromptInput {
                    files: &files,
                    diffs: diffs.as_ref(),
                    previous_message: previous.as_deref(),
                    interval_minutes: self.options.interval_minutes,
                },
                pending.len(),
            )
            .await;

        let full_message = format_commit_message(&timestamp, &message.text);
        match self.vcs.commit(&full_message) {
            Ok(id) => {
                info!(
                    root = %self.root.display(),
                    commit = %id.get(..7).unwrap_or(&id),
                    files = files.len(),
                    source = %message.source,
                    "{}",
                    full_message
                );
                Ok(CycleOutcome::Committed(CommitRecord {
                    id,
                    timestamp,
                    message: full_message,
                    files,
                    source: message.source,
                }))
            }
            Err(GitError::NothingToCommit) => Ok(CycleOutcome::Idle),
            Err(e) => Err(e.into()),
        }
    }

    /// Bring `pending` into the repository's working directory and return
    /// the paths to stage.
    fn collect(&self, pending: &[PathBuf]) -> Result<Vec<String>, CommitError> {
        match &self.staging {
            Staging::Shadow(snapshot) => {
                let report = snapshot.mirror(pending)?;
                if !report.skipped.is_empty() {
                    debug!(skipped = report.skipped.len(), "Some files were not mirrored");
                }
                Ok(report.staged_paths())
            }
            Staging::InPlace => {
                let workdir = self.vcs.workdir();
                let mut files: Vec<String> = pending
                    .iter()
                    .filter_map(|path| match path.strip_prefix(&workdir) {
                        Ok(relative) => Some(to_repo_path(relative)),
                        Err(_) => {
                            warn!("{} is outside {}", path.display(), workdir.display());
                            None
                        }
                    })
                    .collect();
                files.sort();
                files.dedup();
                Ok(files)
            }
        }
    }
}
