//! Snapshot collection: copy changed files into the shadow repository.

pub mod shadow;

pub use shadow::{ShadowSnapshot, SnapshotReport, to_repo_path};
