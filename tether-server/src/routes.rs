//! Route handlers for the file provider.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use tether_core::ServerConfig;

use crate::error::{io_err, ServerError};
use crate::ServerState;

/// Handshake record returned by `/connect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectReply {
    pub success: bool,
    pub allow_edit: bool,
}

/// Build the HTTP router with all endpoints.
///
/// The per-route fallbacks keep the contract uniform: anything outside
/// `GET /getFile` and `GET /connect` is a 404 with an empty body, never
/// a 405.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/getFile", get(get_file).fallback(not_found))
        .route("/connect", get(connect).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
}

/// `/getFile` — the configured target file, ciphered when `encode` is set.
///
/// The `text/html` content type is part of the wire contract and does not
/// reflect the actual payload type.
async fn get_file(State(state): State<Arc<ServerState>>) -> Response {
    match load_target(&state.config) {
        Ok(body) => ok_response(body),
        Err(err) => {
            tracing::error!(error = %err, "failed to read share target");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `/connect` — handshake record, ciphered under the same scheme as the file.
async fn connect(State(state): State<Arc<ServerState>>) -> Response {
    let reply = ConnectReply {
        success: true,
        allow_edit: state.config.allow_edit,
    };
    match serde_json::to_vec(&reply) {
        Ok(body) => ok_response(encode_body(&state.config, body)),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode handshake record");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn ok_response(body: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "text/html")], body).into_response()
}

/// Read the configured target. An empty target path means "nothing shared
/// yet" and yields an empty body rather than an error.
fn load_target(config: &ServerConfig) -> Result<Vec<u8>, ServerError> {
    if config.target.as_os_str().is_empty() {
        return Ok(Vec::new());
    }
    let bytes = std::fs::read(&config.target).map_err(|e| io_err(&config.target, e))?;
    Ok(encode_body(config, bytes))
}

fn encode_body(config: &ServerConfig, body: Vec<u8>) -> Vec<u8> {
    if config.encode {
        tether_cipher::encrypt(&body, config.encode_key.as_bytes())
    } else {
        body
    }
}
