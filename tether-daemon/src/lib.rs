//! Background task scheduler: periodic cycles, cooperative shutdown.

mod error;
mod scheduler;

pub use error::DaemonError;
pub use scheduler::{Daemon, TaskError, TaskFn, TaskFuture, REPEAT_FOREVER};
