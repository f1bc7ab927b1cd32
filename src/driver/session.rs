//! Wiring of one workspace root: tracker, staging, repository and driver.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::cycle::{CommitDriver, DriverOptions, Staging};
use crate::config::{CommitTarget, Config};
use crate::error::CommitError;
use crate::message::{MessageGenerator, TextGenerator};
use crate::snapshot::ShadowSnapshot;
use crate::tracker::{IgnoreRules, WorkspaceTracker};
use crate::vcs::{GitRepository, Vcs};

/// A tracked workspace root and the driver that journals it.
pub struct Session<V, G> {
    pub tracker: WorkspaceTracker,
    pub driver: CommitDriver<V, G>,
}

impl<V: Vcs, G: TextGenerator> Session<V, G> {
    pub fn new(tracker: WorkspaceTracker, driver: CommitDriver<V, G>) -> Self {
        Self { tracker, driver }
    }

    pub fn root(&self) -> &Path {
        self.tracker.root()
    }
}

impl<G: TextGenerator> Session<GitRepository, G> {
    /// Open (or create) the journal repository for `root` and build its
    /// tracker and driver.
    ///
    /// `root` should be canonical so watcher paths compare equal.
    pub fn open(
        root: &Path,
        config: &Config,
        generator: Arc<MessageGenerator<G>>,
    ) -> Result<Self, CommitError> {
        let rules = IgnoreRules::new(root, Some(config.shadow_dir.as_str()), &config.ignore)?;

        let (vcs, staging, shadow_root) = match config.target {
            CommitTarget::Shadow => {
                let shadow_root = config.shadow_root(root);
                let snapshot = ShadowSnapshot::new(root, &shadow_root);
                snapshot.prepare()?;
                let vcs = GitRepository::open_or_init(&shadow_root)?;
                (vcs, Staging::Shadow(snapshot), Some(shadow_root))
            }
            CommitTarget::InPlace => (GitRepository::discover(root)?, Staging::InPlace, None),
        };

        info!(
            root = %root.display(),
            tracking = %config.tracking,
            target = %config.target,
            "Workspace ready"
        );

        let options = DriverOptions {
            use_diffs: config.use_diffs,
            include_previous_message: config.include_previous_message,
            interval_minutes: interval_minutes(config.interval_secs),
        };
        let tracker = WorkspaceTracker::new(config.tracking, rules, shadow_root);
        let driver = CommitDriver::new(root, staging, vcs, generator, options);
        Ok(Self::new(tracker, driver))
    }
}

/// Interval length in whole minutes, rounded up, at least one.
fn interval_minutes(secs: u64) -> u64 {
    secs.div_ceil(60).max(1)
}
