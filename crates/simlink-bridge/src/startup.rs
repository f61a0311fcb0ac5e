//! Bridge startup helper for embedding in the control process.
//!
//! Provides [`spawn_bridge`] which binds the listener eagerly and then
//! serves the exchange endpoints on a background Tokio task, so the
//! controller can keep driving the step loop on its own task.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use simlink_bridge::{BridgeServer, ServerConfig, spawn_bridge};
//!
//! let bridge = Arc::new(BridgeServer::new(None));
//! let handle = spawn_bridge(&ServerConfig::default(), Arc::clone(&bridge)).await?;
//! // Tell the simulation process to call back into handle.local_addr().
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::bridge::BridgeServer;
use crate::server::{ServerConfig, ServerError, bind, serve};

/// Errors that can occur when spawning the bridge server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// A running bridge server.
#[derive(Debug)]
pub struct BridgeHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl BridgeHandle {
    /// The address the server is bound to.
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop serving.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Whether the serving task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the bridge HTTP server on a background Tokio task.
///
/// The listener is bound before this returns, so a bind failure surfaces
/// here and [`BridgeHandle::local_addr`] reports the real port even when
/// the configuration asked for port `0`.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the server cannot bind to the
/// requested address.
pub async fn spawn_bridge(
    config: &ServerConfig,
    bridge: Arc<BridgeServer>,
) -> Result<BridgeHandle, StartupError> {
    let listener = bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("local address unavailable: {e}")))?;

    let task = tokio::spawn(async move {
        if let Err(e) = serve(listener, bridge).await {
            tracing::error!(error = %e, "Bridge server exited with error");
        }
    });

    tracing::info!(%addr, "Bridge server spawned on background task");

    Ok(BridgeHandle { addr, task })
}
