//! Tether server binary — thin launcher around [`tether_server::build_router`].
//!
//! Loads (and self-heals) `./server.json`, then serves on `0.0.0.0:<port>`.

use std::path::Path;

use tokio::net::TcpListener;

use tether_core::ServerConfig;
use tether_server::{build_router, ServerError, ServerState};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    init_tracing();

    let config: ServerConfig = tether_core::load_or_init(Path::new("./server.json"))?;
    let bind = format!("0.0.0.0:{}", config.port);
    let state = ServerState::new(config);

    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|e| io_err(&bind, e))?;
    tracing::info!(%bind, "tether server listening");

    axum::serve(listener, build_router(state))
        .await
        .map_err(|e| io_err(&bind, e))?;
    Ok(())
}

fn io_err(bind: &str, source: std::io::Error) -> ServerError {
    ServerError::Io {
        path: bind.into(),
        source,
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
