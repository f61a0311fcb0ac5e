//! Axum router construction for the exchange bridge.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::bridge::BridgeServer;
use crate::handlers;

/// Largest request body accepted, sized for full-resolution frame buffers.
pub const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Build the complete Axum router for the bridge.
///
/// The router includes:
/// - `GET /ping` -- health check, always `pong`
/// - `POST /train` -- the per-frame exchange
pub fn build_router(bridge: Arc<BridgeServer>) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/train", post(handlers::train))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(bridge)
}
