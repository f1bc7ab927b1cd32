//! Commit driver and the scheduler that runs it.

pub mod cycle;
pub mod scheduler;
pub mod session;

pub use cycle::{
    CommitDriver, CommitRecord, CycleOutcome, DriverOptions, DriverState, Staging,
    commit_timestamp, format_commit_message,
};
pub use scheduler::{Scheduler, Trigger};
pub use session::Session;
