//! Single-task scheduler multiplexing ticks, watcher events, manual triggers
//! and shutdown.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use super::cycle::CycleOutcome;
use super::session::Session;
use crate::message::TextGenerator;
use crate::tracker::{ChangedFiles, FileEvent};
use crate::vcs::Vcs;

/// What started a commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Tick,
    Manual,
    Shutdown,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Tick => f.write_str("tick"),
            Trigger::Manual => f.write_str("manual"),
            Trigger::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Owns every session and the changed-file set.
pub struct Scheduler<V, G> {
    sessions: Vec<Session<V, G>>,
    changed: ChangedFiles,
    interval: Duration,
}

impl<V: Vcs, G: TextGenerator> Scheduler<V, G> {
    pub fn new(sessions: Vec<Session<V, G>>, interval: Duration) -> Self {
        Self {
            sessions,
            changed: ChangedFiles::new(),
            interval,
        }
    }

    pub fn sessions(&self) -> &[Session<V, G>] {
        &self.sessions
    }

    pub fn changed(&self) -> &ChangedFiles {
        &self.changed
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a watcher event against the session that owns its root.
    pub fn record(&mut self, event: FileEvent) -> bool {
        let Some(session) = self.sessions.iter().find(|s| s.root() == event.root) else {
            debug!(root = %event.root.display(), "Event for unknown root");
            return false;
        };
        session.tracker.accept(&mut self.changed, event)
    }

    /// Populate the changed-file set from disk, without watcher history.
    pub fn scan(&mut self) {
        for session in &self.sessions {
            if let Err(e) = session.tracker.scan(&mut self.changed) {
                warn!(root = %session.root().display(), "Scan failed: {}", e);
            }
        }
    }

    /// Run one cycle for every session.
    ///
    /// Errors are logged, never propagated; each root's changed-file set is
    /// cleared either way.
    pub async fn flush_all(&mut self, trigger: Trigger) -> Vec<CycleOutcome> {
        debug!(%trigger, pending = self.changed.total(), "Running commit cycles");

        let mut outcomes = Vec::with_capacity(self.sessions.len());
        for session in &mut self.sessions {
            if let Err(e) = session.tracker.refresh(&mut self.changed) {
                warn!(root = %session.tracker.root().display(), "Could not refresh changes: {}", e);
            }

            match session.driver.run_cycle(&mut self.changed).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(
                        root = %session.tracker.root().display(),
                        %trigger,
                        "Commit cycle failed: {}",
                        e
                    );
                    outcomes.push(CycleOutcome::Idle);
                }
            }
        }
        outcomes
    }

    /// Run until `shutdown` resolves, then run a final cycle.
    ///
    /// The first tick fires one full interval after start. Queued watcher
    /// events are always recorded before a cycle runs.
    pub async fn run<F>(
        &mut self,
        mut events: UnboundedReceiver<FileEvent>,
        mut manual: UnboundedReceiver<()>,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            roots = self.sessions.len(),
            interval_secs = self.interval.as_secs(),
            "Journaling started"
        );

        loop {
            tokio::select! {
                biased;

                Some(event) = events.recv() => {
                    self.record(event);
                }
                _ = &mut shutdown => {
                    info!("Shutting down, running final commit cycle");
                    self.flush_all(Trigger::Shutdown).await;
                    break;
                }
                Some(()) = manual.recv() => {
                    info!("Manual commit requested");
                    self.flush_all(Trigger::Manual).await;
                }
                _ = ticker.tick() => {
                    self.flush_all(Trigger::Tick).await;
                }
            }
        }
    }
}
