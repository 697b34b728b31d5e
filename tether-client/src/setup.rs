//! Session configuration snapshot.

use std::path::PathBuf;
use std::time::Duration;

use tether_core::ClientConfig;

/// Default polling interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Which handshake the remote speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakeMode {
    /// `/connect` returning a JSON `{success, allow_edit}` record,
    /// ciphered when obfuscation is enabled. The standard variant.
    #[default]
    Connect,
    /// Older servers without `/connect`: probe the polling endpoint for a
    /// bare 200 instead. The body is discarded, nothing is written.
    Ping,
}

/// Immutable snapshot of everything a session needs, taken at connect time.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub address: String,
    pub port: u16,
    /// Local path the mirrored file is written to.
    pub target: PathBuf,
    pub encode: bool,
    pub encode_key: String,
    pub interval: Duration,
    pub handshake: HandshakeMode,
}

impl SessionSetup {
    pub fn new(address: impl Into<String>, port: u16, target: impl Into<PathBuf>) -> Self {
        Self {
            address: address.into(),
            port,
            target: target.into(),
            encode: false,
            encode_key: String::new(),
            interval: DEFAULT_INTERVAL,
            handshake: HandshakeMode::default(),
        }
    }

    /// Snapshot from a persisted [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            address: config.address.clone(),
            port: config.port,
            target: config.target.clone(),
            encode: config.encode,
            encode_key: config.encode_key.clone(),
            interval: DEFAULT_INTERVAL,
            handshake: HandshakeMode::default(),
        }
    }

    /// Enable payload obfuscation under `key`.
    pub fn encoded(mut self, key: impl Into<String>) -> Self {
        self.encode = true;
        self.encode_key = key.into();
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn handshake(mut self, mode: HandshakeMode) -> Self {
        self.handshake = mode;
        self
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }
}
