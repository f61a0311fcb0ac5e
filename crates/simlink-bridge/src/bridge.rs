//! Session state and exchange logic of the bridge.
//!
//! [`BridgeServer`] owns everything the two processes share: the outbound
//! slot (actions from the control side), the inbound slot (events for the
//! control side), the expected sequence id, and the optional client token.
//! The sequence id and token are only ever read or changed inside
//! [`BridgeServer::exchange`].
//!
//! # Exchange order
//!
//! 1. Token check (nothing is touched on mismatch).
//! 2. Sequence check under the session lock (nothing is touched on
//!    mismatch).
//! 3. Metadata normalization.
//! 4. Publish the [`Event`] on the inbound slot.
//! 5. Await the next [`Action`] on the outbound slot and flatten it to
//!    plain JSON together with the next sequence id.
//! 6. Advance the expected sequence id.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};
use simlink_types::{Action, Event, FrameBuffer, FrameMetadata, MultiAgentMetadata, SequenceId};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::error::ExchangeError;
use crate::handoff::{Handoff, HandoffError};

/// Wire key carrying the sequence id in the response body.
pub const SEQUENCE_ID_KEY: &str = "sequenceId";

/// One decoded exchange request from the simulation process.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRequest {
    /// The `metadata` part.
    pub metadata: FrameMetadata,
    /// The `actionReturns` part, passed through untouched.
    pub action_returns: Vec<Value>,
    /// The `token` part, if sent.
    pub token: Option<String>,
    /// Every other multipart part, kept opaque.
    pub frames: Vec<FrameBuffer>,
}

impl ExchangeRequest {
    /// A request carrying only metadata.
    pub const fn new(metadata: FrameMetadata) -> Self {
        Self {
            metadata,
            action_returns: Vec::new(),
            token: None,
            frames: Vec::new(),
        }
    }

    /// Attach a client token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Shared state of one bridge session.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected into the Axum handlers
/// via the `State` extractor; the controller holds another clone.
#[derive(Debug)]
pub struct BridgeServer {
    outbound: Handoff<Action>,
    inbound: Handoff<Event>,
    sequence_id: AtomicU64,
    token: Option<String>,
    exchange_lock: Mutex<()>,
}

impl BridgeServer {
    /// Create a session. When `token` is set every exchange must present
    /// exactly that value.
    pub fn new(token: Option<String>) -> Self {
        Self {
            outbound: Handoff::new(),
            inbound: Handoff::new(),
            sequence_id: AtomicU64::new(SequenceId::INITIAL.into_inner()),
            token,
            exchange_lock: Mutex::new(()),
        }
    }

    /// The configured client token.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The sequence id the next exchange must present.
    pub fn sequence_id(&self) -> SequenceId {
        SequenceId(self.sequence_id.load(Ordering::Acquire))
    }

    /// Control side: queue the next action for the simulation.
    pub fn send(&self, action: Action) -> Result<(), HandoffError> {
        self.outbound.put(action)
    }

    /// Control side: wait for the next event from the simulation.
    pub async fn receive(&self) -> Result<Event, HandoffError> {
        self.inbound.get().await
    }

    /// The outbound (control to simulation) slot.
    pub const fn outbound(&self) -> &Handoff<Action> {
        &self.outbound
    }

    /// The inbound (simulation to control) slot.
    pub const fn inbound(&self) -> &Handoff<Event> {
        &self.inbound
    }

    /// Run one exchange on behalf of the simulation process.
    ///
    /// Returns the JSON body to send back: the next action's wire fields
    /// plus `sequenceId`. Waits for the control side to queue an action if
    /// none is pending yet.
    pub async fn exchange(
        &self,
        request: ExchangeRequest,
    ) -> Result<Map<String, Value>, ExchangeError> {
        self.authorize(request.token.as_deref())?;

        let _session = self.exchange_lock.lock().await;

        let expected = self.sequence_id();
        let presented = request.metadata.sequence_id;
        if presented != expected {
            error!(%expected, %presented, "sequence id mismatch, session desynchronized");
            return Err(ExchangeError::SequenceMismatch {
                expected,
                presented,
            });
        }
        let next = expected.next().ok_or_else(|| {
            ExchangeError::ProtocolViolation("sequence id exhausted".to_owned())
        })?;

        let metadata = MultiAgentMetadata::try_from(request.metadata)?;
        let agent_count = metadata.agents().len();
        let event = Event::new(metadata)
            .with_frames(request.frames)
            .with_action_returns(request.action_returns);

        self.inbound.put(event)?;
        debug!(sequence_id = %expected, agent_count, "event published, awaiting action");

        let action = self.outbound.get().await?;
        let mut body = action.to_wire();
        body.insert(SEQUENCE_ID_KEY.to_owned(), Value::from(next.into_inner()));

        self.sequence_id.store(next.into_inner(), Ordering::Release);
        debug!(sequence_id = %next, action = action.name(), "action delivered");

        Ok(body)
    }

    fn authorize(&self, presented: Option<&str>) -> Result<(), ExchangeError> {
        match self.token.as_deref() {
            None => Ok(()),
            Some(expected) if presented == Some(expected) => Ok(()),
            Some(_) => {
                warn!("exchange rejected: client token mismatch");
                Err(ExchangeError::Unauthorized)
            }
        }
    }
}

impl Default for BridgeServer {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use simlink_types::{AgentMetadata, InitializeParams, NdArray};

    use super::*;

    fn frame(sequence_id: u64) -> FrameMetadata {
        FrameMetadata {
            agents: vec![AgentMetadata(
                json!({"agentId": 0, "lastActionSuccess": true})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            )],
            sequence_id: SequenceId(sequence_id),
            active_agent_id: None,
        }
    }

    #[tokio::test]
    async fn exchange_returns_pending_action_and_advances() {
        let bridge = BridgeServer::default();
        assert_eq!(bridge.send(Action::RotateRight(Default::default())), Ok(()));

        let body = bridge.exchange(ExchangeRequest::new(frame(0))).await;
        assert_eq!(
            body.ok().map(Value::Object),
            Some(json!({"action": "RotateRight", "sequenceId": 1}))
        );
        assert_eq!(bridge.sequence_id(), SequenceId(1));
        assert!(bridge.inbound().try_get().is_some());
    }

    #[tokio::test]
    async fn desync_is_rejected_without_side_effects() {
        let bridge = BridgeServer::default();
        assert_eq!(bridge.send(Action::Pass(Default::default())), Ok(()));

        for presented in [1, 2, u64::MAX] {
            let result = bridge.exchange(ExchangeRequest::new(frame(presented))).await;
            assert!(matches!(
                result,
                Err(ExchangeError::SequenceMismatch { expected: SequenceId(0), .. })
            ));
        }
        assert_eq!(bridge.sequence_id(), SequenceId(0));
        assert!(bridge.inbound().is_empty());
        assert!(!bridge.outbound().is_empty());
    }

    #[tokio::test]
    async fn token_mismatch_is_rejected_before_sequence_check() {
        let bridge = BridgeServer::new(Some("123456".to_owned()));
        assert_eq!(bridge.send(Action::Pass(Default::default())), Ok(()));

        let wrong = ExchangeRequest::new(frame(1)).with_token("12cb40b5");
        assert!(matches!(
            bridge.exchange(wrong).await,
            Err(ExchangeError::Unauthorized)
        ));
        let missing = ExchangeRequest::new(frame(0));
        assert!(matches!(
            bridge.exchange(missing).await,
            Err(ExchangeError::Unauthorized)
        ));
        assert_eq!(bridge.sequence_id(), SequenceId(0));
        assert!(bridge.inbound().is_empty());
        assert!(!bridge.outbound().is_empty());
    }

    #[tokio::test]
    async fn matching_token_is_accepted() {
        let bridge = BridgeServer::new(Some("1234567".to_owned()));
        assert_eq!(bridge.send(Action::Pass(Default::default())), Ok(()));
        let request = ExchangeRequest::new(frame(0)).with_token("1234567");
        assert!(bridge.exchange(request).await.is_ok());
    }

    #[tokio::test]
    async fn wrapped_numeric_values_are_flattened() {
        let bridge = BridgeServer::default();
        let teleport = Action::custom("Teleport")
            .with("moveMagnitude", NdArray::scalar(55.5))
            .with("myCustomArray", NdArray::vector([1_i64, 2]));
        assert_eq!(bridge.send(teleport.into()), Ok(()));

        let body = bridge.exchange(ExchangeRequest::new(frame(0))).await;
        assert_eq!(
            body.ok().map(Value::Object),
            Some(json!({
                "action": "Teleport",
                "moveMagnitude": 55.5,
                "myCustomArray": [1, 2],
                "sequenceId": 1,
            }))
        );
    }

    #[tokio::test]
    async fn exchange_waits_for_a_concurrent_send() {
        let bridge = Arc::new(BridgeServer::default());
        let sim = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move { bridge.exchange(ExchangeRequest::new(frame(0))).await })
        };

        let event = bridge.receive().await;
        assert!(event.is_ok_and(|e| e.last_action_success()));
        assert_eq!(bridge.sequence_id(), SequenceId(0));

        assert_eq!(
            bridge.send(Action::Initialize(InitializeParams::default())),
            Ok(())
        );
        let body = sim.await.ok().and_then(Result::ok).map(Value::Object);
        assert_eq!(body, Some(json!({"action": "Initialize", "sequenceId": 1})));
        assert_eq!(bridge.sequence_id(), SequenceId(1));
    }

    #[tokio::test]
    async fn unconsumed_event_is_a_protocol_violation() {
        let bridge = BridgeServer::default();
        let stale = Event::new(MultiAgentMetadata::single(AgentMetadata::default()));
        assert_eq!(bridge.inbound().put(stale), Ok(()));

        let result = bridge.exchange(ExchangeRequest::new(frame(0))).await;
        assert!(matches!(result, Err(ExchangeError::ProtocolViolation(_))));
        assert_eq!(bridge.sequence_id(), SequenceId(0));
    }

    #[tokio::test]
    async fn empty_agent_list_is_malformed() {
        let bridge = BridgeServer::default();
        let mut metadata = frame(0);
        metadata.agents.clear();
        let result = bridge.exchange(ExchangeRequest::new(metadata)).await;
        assert!(matches!(result, Err(ExchangeError::MalformedRequest(_))));
        assert!(bridge.inbound().is_empty());
        assert_eq!(bridge.sequence_id(), SequenceId(0));
    }
}
