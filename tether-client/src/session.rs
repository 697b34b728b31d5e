//! Session lifecycle: handshake, polling loop, termination.
//!
//! [`start_session`] performs the whole pre-connection dance and only
//! returns a [`Session`] once polling is running, so a session is born
//! [`ConnectionState::Connected`]. Handshake failures end the attempt
//! before any polling task is registered; a fatal error inside a polling
//! cycle stops the scheduler, which [`Session::state`] reports as
//! [`ConnectionState::Terminated`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use tether_daemon::Daemon;

use crate::error::{transport_err, ClientError};
use crate::setup::{HandshakeMode, SessionSetup};
use crate::writer;

/// Bound on every network call so a dead peer cannot hang a cycle forever.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Observable lifecycle of one client-to-server polling relationship.
///
/// The pre-connection phases (disconnected, handshaking) only exist inside
/// [`start_session`], which either returns a connected [`Session`] or an
/// error; they are never visible on a constructed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Terminated,
}

/// Handshake record returned by the server's `/connect` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeReply {
    pub success: bool,
    pub allow_edit: bool,
}

/// A running mirror session. Dropping it without [`Session::stop`] signals
/// the scheduler to wind down but does not wait for the in-flight cycle.
#[derive(Debug)]
pub struct Session {
    daemon: Daemon,
    allow_edit: bool,
    target: PathBuf,
}

impl Session {
    /// Connected while the polling loop is alive, Terminated after it has
    /// stopped (gracefully or through a fatal cycle error).
    pub fn state(&self) -> ConnectionState {
        if self.daemon.is_alive() {
            ConnectionState::Connected
        } else {
            ConnectionState::Terminated
        }
    }

    /// Edit permission granted by the server during the handshake
    /// (always `false` for the legacy ping handshake).
    pub fn allow_edit(&self) -> bool {
        self.allow_edit
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Gracefully terminate: signal the scheduler, wait for the in-flight
    /// cycle, and surface any fatal error a previous cycle died with.
    pub async fn stop(mut self) -> Result<(), ClientError> {
        tracing::info!(target = %self.target.display(), "stopping mirror session");
        self.daemon.kill(true).await?;
        Ok(())
    }
}

/// Handshake with the remote and start polling its file on a timer.
///
/// Any handshake failure — unreachable server, non-200 status, undecodable
/// record, or `success: false` — returns the error without ever issuing a
/// fetch, leaving nothing running.
pub async fn start_session(setup: SessionSetup) -> Result<Session, ClientError> {
    let client = Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(ClientError::Http)?;

    tracing::info!(url = %setup.base_url(), mode = ?setup.handshake, "handshaking");
    let allow_edit = handshake(&client, &setup).await?;

    let mut daemon = Daemon::new(setup.interval);
    let target = setup.target.clone();
    let task_setup = Arc::new(setup);
    daemon
        .add_task(move || {
            let client = client.clone();
            let setup = task_setup.clone();
            Box::pin(async move { pull_file(&client, &setup).await.map_err(Into::into) })
        })
        .await;

    daemon.start()?;
    tracing::info!(target = %target.display(), "mirror session connected");

    Ok(Session {
        daemon,
        allow_edit,
        target,
    })
}

async fn handshake(client: &Client, setup: &SessionSetup) -> Result<bool, ClientError> {
    match setup.handshake {
        HandshakeMode::Connect => {
            let body = fetch_ok(client, &format!("{}/connect", setup.base_url())).await?;
            let plain = decode_body(setup, body);
            let reply: HandshakeReply = serde_json::from_slice(&plain)
                .map_err(|err| ClientError::Decode(err.to_string()))?;
            if !reply.success {
                return Err(ClientError::Rejected);
            }
            Ok(reply.allow_edit)
        }
        HandshakeMode::Ping => {
            // No record to validate; a 200 from the polling endpoint is the
            // whole handshake. The body is discarded, nothing is written.
            fetch_ok(client, &format!("{}/getFile", setup.base_url())).await?;
            Ok(false)
        }
    }
}

/// One polling cycle: fetch, decipher, replace the target wholesale.
async fn pull_file(client: &Client, setup: &SessionSetup) -> Result<(), ClientError> {
    let body = fetch_ok(client, &format!("{}/getFile", setup.base_url())).await?;
    let data = decode_body(setup, body);
    let target = setup.target.clone();
    tokio::task::spawn_blocking(move || writer::replace_file(&target, &data)).await??;
    Ok(())
}

/// GET `url`, insisting on a 200. Non-200 is fatal to the caller's cycle;
/// the body is never touched on a bad status.
async fn fetch_ok(client: &Client, url: &str) -> Result<Vec<u8>, ClientError> {
    let response = client.get(url).send().await.map_err(transport_err)?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(ClientError::Status {
            status: status.as_u16(),
        });
    }
    let body = response.bytes().await.map_err(transport_err)?;
    Ok(body.to_vec())
}

fn decode_body(setup: &SessionSetup, body: Vec<u8>) -> Vec<u8> {
    if setup.encode {
        tether_cipher::decrypt(&body, setup.encode_key.as_bytes())
    } else {
        body
    }
}
