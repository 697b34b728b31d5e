//! Pull-based file mirroring client.
//!
//! A session handshakes with a remote file provider, then polls its
//! `/getFile` endpoint on a fixed interval and replaces a local target file
//! with each payload (deciphered first when obfuscation is enabled).
//!
//! Public API surface:
//! - [`SessionSetup`] — immutable connection snapshot
//! - [`start_session`] — handshake + spawn the polling loop
//! - [`Session`] — running mirror; [`Session::stop`] for graceful shutdown
//! - [`ClientError`] — error taxonomy (transport / status / decode / rejected)

mod error;
mod session;
mod setup;
mod writer;

pub use error::ClientError;
pub use session::{start_session, ConnectionState, HandshakeReply, Session};
pub use setup::{HandshakeMode, SessionSetup, DEFAULT_INTERVAL};
