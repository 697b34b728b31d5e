//! Tether core library — configuration types, persistence, errors.
//!
//! Public API surface:
//! - [`config`] — client/server config structs + self-healing JSON store
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;

pub use config::{load_or_init, save, ClientConfig, ServerConfig};
pub use error::ConfigError;
