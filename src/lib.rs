//! worklog - a background journal for workspace changes.
//!
//! # Overview
//!
//! worklog watches one or more workspace roots, and on a fixed interval (or on
//! demand) commits every changed file into a git repository with a message
//! written by a text-generation model. When the model is unavailable the
//! commit still happens with a fallback message.
//!
//! Changes are tracked either with a filesystem watcher or by querying git
//! status. Commits land either in a shadow repository inside the workspace
//! (`.code-tracking` by default) or in the workspace repository itself.

pub mod config;
pub mod driver;
pub mod error;
pub mod message;
pub mod snapshot;
pub mod tracker;
pub mod vcs;

// Re-export commonly used types
pub use config::{CommitTarget, Config, Overrides, TrackingMode};
pub use driver::{CommitDriver, CommitRecord, CycleOutcome, Scheduler, Session, Trigger};
pub use error::{CommitError, ConfigError, GenerationError, GitError, SnapshotError, TrackerError};
pub use message::{GeminiClient, MessageGenerator, MessageSource, TextGenerator};
pub use tracker::{ChangedFiles, FileEvent, WorkspaceTracker, WorkspaceWatcher};
pub use vcs::{GitRepository, JournalEntry, Vcs};
