//! Bridge HTTP server lifecycle management.
//!
//! Provides [`bind`] and [`serve`] as separate steps so callers can learn
//! the bound address (useful with port `0`) before the simulation process
//! is told where to connect, plus [`start_server`] which does both.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::info;

use crate::bridge::BridgeServer;
use crate::router::build_router;

/// Configuration for the bridge server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to. Loopback by default; the protocol
    /// trusts anything that can reach it.
    #[serde(default = "default_host")]
    pub host: String,
    /// The TCP port to listen on; `0` picks a free port.
    #[serde(default)]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
        }
    }
}

fn default_host() -> String {
    String::from("127.0.0.1")
}

/// Bind a TCP listener for the configured address.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is invalid or in use.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve the bridge on an already bound listener until the task is
/// aborted or a fatal I/O error occurs.
pub async fn serve(listener: TcpListener, bridge: Arc<BridgeServer>) -> Result<(), ServerError> {
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Serve(format!("local address unavailable: {e}")))?;
    info!(%addr, "Bridge server listening");

    axum::serve(listener, build_router(bridge))
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))
}

/// Bind and serve in one step.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server(
    config: &ServerConfig,
    bridge: Arc<BridgeServer>,
) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    serve(listener, bridge).await
}

/// Errors that can occur when starting or running the bridge server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
