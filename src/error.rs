//! Error types for worklog modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from change tracking (watcher, ignore rules, rescans).
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Failed to start file watcher for {path}: {source}")]
    WatchFailed {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    #[error("Failed to query repository status: {0}")]
    StatusFailed(#[source] git2::Error),
}

/// Errors from copying files into the shadow directory.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to create shadow directory {path}: {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove shadow copy {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path {0} is outside the workspace")]
    OutsideWorkspace(PathBuf),

    #[error("Path {0} is inside the shadow directory")]
    InsideShadow(PathBuf),
}

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to open repository at {path}: {source}")]
    OpenRepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to initialize repository at {path}: {source}")]
    InitRepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Repository at {0} has no working directory")]
    BareRepository(PathBuf),

    #[error("Failed to read status: {0}")]
    StatusFailed(#[source] git2::Error),

    #[error("Failed to collect diff: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Failed to stage changes: {0}")]
    StagingFailed(#[source] git2::Error),

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Staged tree is identical to HEAD, nothing to commit")]
    NothingToCommit,

    #[error("Failed to walk commit history: {0}")]
    RevwalkError(#[source] git2::Error),
}

/// Errors from the external text-generation service.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No API key configured. Set WORKLOG_API_KEY or GEMINI_API_KEY")]
    MissingApiKey,

    #[error("Request to text-generation API failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Text-generation API rejected the API key (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("Text-generation API quota exhausted: {message}")]
    QuotaExceeded { message: String },

    #[error("Text-generation API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Text-generation API returned an unreadable response: {0}")]
    InvalidResponse(String),

    #[error("Text-generation API returned no text")]
    EmptyResponse,
}

/// Errors from a commit cycle.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}
