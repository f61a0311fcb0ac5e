//! HTTP handlers for the two bridge endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use serde_json::{Map, Value};

use crate::bridge::BridgeServer;
use crate::error::ExchangeError;
use crate::form::decode_exchange;

/// Literal body of the health check.
pub const PING_RESPONSE: &str = "pong";

/// `GET /ping` -- liveness check. No side effects.
pub async fn ping() -> &'static str {
    PING_RESPONSE
}

/// `POST /train` -- one frame exchange.
///
/// Decodes the posted frame, hands it to the control side, and responds
/// with the next queued action. The response is held open until the
/// control side queues that action.
pub async fn train(
    State(bridge): State<Arc<BridgeServer>>,
    request: Request,
) -> Result<Json<Map<String, Value>>, ExchangeError> {
    let exchange = decode_exchange(request).await?;
    let body = bridge.exchange(exchange).await?;
    Ok(Json(body))
}
