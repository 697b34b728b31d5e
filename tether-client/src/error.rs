//! Client error taxonomy.
//!
//! Each variant is a distinct, human-describable outcome: callers (a GUI
//! or CLI) can tell "server unreachable" from "bad status" from
//! "wrong key" from "rejected" without string matching.

use std::path::PathBuf;

use thiserror::Error;

/// All errors a sync session can surface.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, DNS failure, or timeout. Never retried by the
    /// session itself; the polling cadence is the only retry mechanism.
    #[error("cannot reach server: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with a non-200 status.
    #[error("server returned status {status}")]
    Status { status: u16 },

    /// Response body failed to decipher or parse — the usual symptom of a
    /// wrong or missing shared key.
    #[error("could not decode server response (wrong key?): {0}")]
    Decode(String),

    /// Handshake record carried `success: false`.
    #[error("server rejected the connection")]
    Rejected,

    /// Local filesystem failure while materializing the target.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scheduler lifecycle failure (including a fatal polling-task error
    /// surfaced through `Session::stop`).
    #[error("scheduler error: {0}")]
    Daemon(#[from] tether_daemon::DaemonError),

    /// HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[source] reqwest::Error),

    /// A blocking write task was cancelled or panicked.
    #[error("write task join failure: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ClientError {
    ClientError::Io {
        path: path.into(),
        source,
    }
}

/// Classify a reqwest failure: anything that happened on the wire is a
/// transport condition; only client-construction bugs land in `Http`.
pub(crate) fn transport_err(err: reqwest::Error) -> ClientError {
    if err.is_builder() {
        ClientError::Http(err)
    } else {
        ClientError::Transport(err)
    }
}
