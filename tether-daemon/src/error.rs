use thiserror::Error;

use crate::scheduler::TaskError;

/// Error surface for the scheduler run loop and its lifecycle controls.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// `start` was called while a run is active. Exactly one concurrent run
    /// is permitted per instance.
    #[error("daemon is already running")]
    AlreadyRunning,

    /// A task failed; the run aborted and callbacks were skipped.
    #[error("daemon task failed: {0}")]
    Task(#[source] TaskError),

    /// A termination callback failed.
    #[error("daemon callback failed: {0}")]
    Callback(#[source] TaskError),

    /// The run-loop task panicked or was cancelled out from under us.
    #[error("daemon loop join failure: {0}")]
    Join(#[from] tokio::task::JoinError),
}
