//! Decoding of exchange request bodies.
//!
//! The simulation posts each frame as `multipart/form-data`; simpler
//! clients may post the same fields `application/x-www-form-urlencoded`.
//! Both decode into an [`ExchangeRequest`]. In multipart bodies any part
//! other than `metadata`, `actionReturns`, and `token` is kept as an opaque
//! [`FrameBuffer`].

use std::collections::HashMap;

use axum::Form;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde_json::Value;
use simlink_types::{FrameBuffer, FrameMetadata};

use crate::bridge::ExchangeRequest;
use crate::error::ExchangeError;

const METADATA_PART: &str = "metadata";
const ACTION_RETURNS_PART: &str = "actionReturns";
const TOKEN_PART: &str = "token";

/// Decode an exchange request body, dispatching on its content type.
pub async fn decode_exchange(request: Request) -> Result<ExchangeRequest, ExchangeError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ExchangeError::MalformedRequest(e.body_text()))?;
        from_multipart(multipart).await
    } else {
        let Form(mut fields) = Form::<HashMap<String, String>>::from_request(request, &())
            .await
            .map_err(|e| ExchangeError::MalformedRequest(e.body_text()))?;
        RawParts {
            metadata: fields.remove(METADATA_PART),
            action_returns: fields.remove(ACTION_RETURNS_PART),
            token: fields.remove(TOKEN_PART),
            frames: Vec::new(),
        }
        .into_request()
    }
}

async fn from_multipart(mut multipart: Multipart) -> Result<ExchangeRequest, ExchangeError> {
    let mut parts = RawParts::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ExchangeError::MalformedRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            METADATA_PART | ACTION_RETURNS_PART | TOKEN_PART => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ExchangeError::MalformedRequest(e.body_text()))?;
                let slot = match name.as_str() {
                    METADATA_PART => &mut parts.metadata,
                    ACTION_RETURNS_PART => &mut parts.action_returns,
                    _ => &mut parts.token,
                };
                *slot = Some(text);
            }
            _ => {
                let content_type = field.content_type().map(str::to_owned);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ExchangeError::MalformedRequest(e.body_text()))?;
                parts.frames.push(FrameBuffer {
                    name,
                    content_type,
                    data: data.to_vec(),
                });
            }
        }
    }

    parts.into_request()
}

/// Undecoded form fields.
#[derive(Debug, Default)]
struct RawParts {
    metadata: Option<String>,
    action_returns: Option<String>,
    token: Option<String>,
    frames: Vec<FrameBuffer>,
}

impl RawParts {
    fn into_request(self) -> Result<ExchangeRequest, ExchangeError> {
        let metadata = self.metadata.ok_or_else(|| {
            ExchangeError::MalformedRequest(format!("missing `{METADATA_PART}` part"))
        })?;
        let metadata: FrameMetadata = serde_json::from_str(&metadata)?;

        let action_returns = match self.action_returns.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(raw) => serde_json::from_str::<Vec<Value>>(raw)?,
        };

        let token = self.token.filter(|t| !t.is_empty());

        Ok(ExchangeRequest {
            metadata,
            action_returns,
            token,
            frames: self.frames,
        })
    }
}
