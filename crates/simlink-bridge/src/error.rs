//! Error types for the exchange bridge.
//!
//! [`ExchangeError`] unifies every way an exchange can be rejected into a
//! single enum that converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use simlink_types::{MetadataError, SequenceId};

use crate::handoff::HandoffError;

/// Errors that can occur while handling an exchange.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The presented token does not match the configured secret.
    #[error("client token mismatch")]
    Unauthorized,

    /// The presented sequence id is not the one the bridge expects.
    ///
    /// The session cannot continue after this; there is no resync.
    #[error("sequence id mismatch: expected {expected}, presented {presented}")]
    SequenceMismatch {
        /// The id the bridge expected.
        expected: SequenceId,
        /// The id the simulation presented.
        presented: SequenceId,
    },

    /// The request body could not be decoded.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A JSON part of the request could not be parsed.
    #[error("invalid JSON part: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The hand-off discipline was broken (e.g. a frame arrived while the
    /// previous one was still unconsumed).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl From<MetadataError> for ExchangeError {
    fn from(err: MetadataError) -> Self {
        Self::MalformedRequest(err.to_string())
    }
}

impl From<HandoffError> for ExchangeError {
    fn from(err: HandoffError) -> Self {
        Self::ProtocolViolation(err.to_string())
    }
}

impl IntoResponse for ExchangeError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::MalformedRequest(_) | Self::Serialization(_) => StatusCode::BAD_REQUEST,
            Self::SequenceMismatch { .. } | Self::ProtocolViolation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
