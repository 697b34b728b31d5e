//! HTTP file provider: serves one configured file to polling clients.
//!
//! Wire contract:
//!
//! | Path       | 200 body                                   | Notes |
//! |------------|--------------------------------------------|-------|
//! | `/getFile` | target file bytes, ciphered when `encode`  | `Content-Type: text/html` regardless of payload |
//! | `/connect` | JSON `{success, allow_edit}`, same cipher  | handshake |
//! | other      | 404, empty body                            | |
//!
//! Any handler failure is a 500 with an empty body.

mod error;
mod routes;

use std::sync::Arc;

use tether_core::ServerConfig;

pub use error::ServerError;
pub use routes::{build_router, ConnectReply};

/// Shared state behind the router: the config snapshot taken at startup.
pub struct ServerState {
    pub config: ServerConfig,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self { config })
    }
}
