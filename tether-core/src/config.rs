//! Self-healing JSON configuration store.
//!
//! # Storage format
//!
//! One JSON object per config file, pretty-printed with stable indentation.
//! Struct fields are declared in sorted order so the serialized keys are
//! sorted too — rewrites of an unchanged config are byte-identical.
//!
//! # Healing
//!
//! [`load_or_init`] never fails on a missing or corrupt file: it rewrites
//! the defaults to disk and returns them, so first-run behavior (and
//! recovery from a hand-mangled file) needs no operator action. Missing
//! keys in an otherwise valid file fall back per-key via `#[serde(default)]`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Client-side configuration: where to pull from and where to land the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host or IP to poll.
    pub address: String,
    pub allow_edit: bool,
    /// Whether payloads are obfuscated in transit.
    pub encode: bool,
    pub encode_key: String,
    pub port: u16,
    /// Local path the mirrored file is written to.
    pub target: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            allow_edit: false,
            encode: true,
            encode_key: String::new(),
            port: 8080,
            target: PathBuf::from("./databuffer.txt"),
        }
    }
}

/// Server-side configuration: which file to expose and under which key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Advertised to clients in the handshake record.
    pub allow_edit: bool,
    pub encode: bool,
    pub encode_key: String,
    pub port: u16,
    /// Path of the file served to clients; empty means "nothing shared yet".
    pub target: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allow_edit: false,
            encode: true,
            encode_key: String::new(),
            port: 8080,
            target: PathBuf::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load a config from `path`, healing a missing or corrupt file by writing
/// the defaults back and returning them.
pub fn load_or_init<T>(path: &Path) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned + Default,
{
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "config file unreadable; rewriting defaults",
                );
                heal(path)
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => heal(path),
        Err(err) => Err(io_err(path, err)),
    }
}

fn heal<T>(path: &Path) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned + Default,
{
    let config = T::default();
    save(path, &config)?;
    Ok(config)
}

/// Atomically save a config to `path`.
///
/// Write flow: serialize → `.tmp` sibling → `rename`. The `.tmp` is always
/// in the same directory as the target (same filesystem — no EXDEV).
pub fn save<T: Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(config)?;
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }

    std::fs::write(&tmp, format!("{json}\n")).map_err(|e| io_err(&tmp, e))?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, err));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
