//! Normalized per-frame results returned by the simulation process.
//!
//! Every exchange carries a metadata document describing one or more
//! agents. The bridge normalizes that document into [`MultiAgentMetadata`]
//! (a single agent becomes a one-element list) and wraps it, together with
//! any opaque frame buffers and the pass-through `actionReturns`, into an
//! [`Event`].
//!
//! # Classification
//!
//! [`Event::classify`] decides whether a consumed event must surface as an
//! error:
//!
//! - error code [`INVALID_ACTION`]: always an [`EventError::InvalidAction`]
//!   carrying the simulation's message verbatim;
//! - unsuccessful action in strict mode: [`EventError::ActionFailed`];
//! - anything else: `Ok(())`, with the success flag left for the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::SequenceId;
use crate::point::Point3;

/// Error code the simulation reports for an operation it does not know.
pub const INVALID_ACTION: &str = "InvalidAction";

/// Metadata reported for one agent in one frame.
///
/// The document is open-ended; the accessors below read the handful of
/// keys the bridge itself relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentMetadata(pub Map<String, Value>);

impl AgentMetadata {
    /// Look up a raw metadata value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `lastActionSuccess`; absent is treated as failure.
    pub fn last_action_success(&self) -> bool {
        self.get("lastActionSuccess")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// `errorCode`, if present and non-empty.
    pub fn error_code(&self) -> Option<&str> {
        self.get("errorCode")
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
    }

    /// `errorMessage`, or the empty string.
    pub fn error_message(&self) -> &str {
        self.get("errorMessage")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// `agentId`, if reported.
    pub fn agent_id(&self) -> Option<u64> {
        self.get("agentId").and_then(Value::as_u64)
    }

    /// `screenWidth` in pixels.
    pub fn screen_width(&self) -> Option<u64> {
        self.get("screenWidth").and_then(Value::as_u64)
    }

    /// `screenHeight` in pixels.
    pub fn screen_height(&self) -> Option<u64> {
        self.get("screenHeight").and_then(Value::as_u64)
    }

    /// `agent.position`, if reported.
    pub fn agent_position(&self) -> Option<Point3> {
        self.get("agent")
            .and_then(|agent| agent.get("position"))
            .and_then(|position| Point3::deserialize(position).ok())
    }
}

impl From<Map<String, Value>> for AgentMetadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// The `metadata` part of an exchange request, as sent by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMetadata {
    /// Per-agent metadata in presentation order.
    pub agents: Vec<AgentMetadata>,
    /// The sequence id the simulation was last handed.
    pub sequence_id: SequenceId,
    /// Index of the primary agent (multi-agent sessions only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_agent_id: Option<usize>,
}

/// Metadata that cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    /// The frame reported no agents at all.
    #[error("metadata contains no agents")]
    NoAgents,

    /// The active agent pointer does not name a reported agent.
    #[error("active agent {active} out of range for {count} agents")]
    ActiveAgentOutOfRange {
        /// The presented active agent index.
        active: usize,
        /// How many agents were reported.
        count: usize,
    },
}

/// Ordered per-agent metadata plus the primary agent pointer.
///
/// Always holds at least one agent and a valid active index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiAgentMetadata {
    agents: Vec<AgentMetadata>,
    active_agent_id: usize,
}

impl MultiAgentMetadata {
    /// Normalize a frame's agent list.
    ///
    /// A missing active pointer selects the first agent.
    pub fn new(
        agents: Vec<AgentMetadata>,
        active_agent_id: Option<usize>,
    ) -> Result<Self, MetadataError> {
        if agents.is_empty() {
            return Err(MetadataError::NoAgents);
        }
        let active = active_agent_id.unwrap_or(0);
        if active >= agents.len() {
            return Err(MetadataError::ActiveAgentOutOfRange {
                active,
                count: agents.len(),
            });
        }
        Ok(Self {
            agents,
            active_agent_id: active,
        })
    }

    /// Wrap a single agent as a one-element list.
    pub fn single(agent: AgentMetadata) -> Self {
        Self {
            agents: vec![agent],
            active_agent_id: 0,
        }
    }

    /// All agents in presentation order.
    pub fn agents(&self) -> &[AgentMetadata] {
        &self.agents
    }

    /// Index of the primary agent.
    pub const fn active_agent_id(&self) -> usize {
        self.active_agent_id
    }

    /// Metadata of the primary agent.
    pub fn active(&self) -> Option<&AgentMetadata> {
        self.agents.get(self.active_agent_id)
    }
}

impl TryFrom<FrameMetadata> for MultiAgentMetadata {
    type Error = MetadataError;

    fn try_from(frame: FrameMetadata) -> Result<Self, Self::Error> {
        Self::new(frame.agents, frame.active_agent_id)
    }
}

/// An opaque binary part delivered alongside a frame (images, depth, ...).
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct FrameBuffer {
    /// Multipart field name.
    pub name: String,
    /// Declared content type, if any.
    pub content_type: Option<String>,
    /// Raw bytes, never decoded by the bridge.
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl core::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// A consumed event that must be surfaced as an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The simulation does not recognize the requested operation.
    #[error("{message}")]
    InvalidAction {
        /// The simulation's message, verbatim.
        message: String,
    },

    /// A recognized operation ran and reported failure.
    #[error("action failed ({}): {message}", .code.as_deref().unwrap_or("no error code"))]
    ActionFailed {
        /// The simulation's error code, if any.
        code: Option<String>,
        /// The simulation's error message.
        message: String,
    },
}

/// The normalized result of one simulation frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    metadata: MultiAgentMetadata,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    frames: Vec<FrameBuffer>,
    #[serde(rename = "actionReturns")]
    action_returns: Vec<Value>,
}

impl Event {
    /// Build an event from normalized metadata.
    pub const fn new(metadata: MultiAgentMetadata) -> Self {
        Self {
            metadata,
            frames: Vec::new(),
            action_returns: Vec::new(),
        }
    }

    /// Build a single-agent event from one metadata map.
    pub fn single(agent: impl Into<AgentMetadata>) -> Self {
        Self::new(MultiAgentMetadata::single(agent.into()))
    }

    /// Attach opaque frame buffers.
    #[must_use]
    pub fn with_frames(mut self, frames: Vec<FrameBuffer>) -> Self {
        self.frames = frames;
        self
    }

    /// Attach the pass-through `actionReturns` list.
    #[must_use]
    pub fn with_action_returns(mut self, action_returns: Vec<Value>) -> Self {
        self.action_returns = action_returns;
        self
    }

    /// Per-agent metadata, in presentation order.
    pub fn agents(&self) -> &[AgentMetadata] {
        self.metadata.agents()
    }

    /// Index of the primary agent.
    pub const fn active_agent_id(&self) -> usize {
        self.metadata.active_agent_id()
    }

    /// Metadata of the primary agent.
    pub fn metadata(&self) -> Option<&AgentMetadata> {
        self.metadata.active()
    }

    /// Opaque frame buffers delivered with this frame.
    pub fn frames(&self) -> &[FrameBuffer] {
        &self.frames
    }

    /// Look up a frame buffer by its multipart field name.
    pub fn frame(&self, name: &str) -> Option<&FrameBuffer> {
        self.frames.iter().find(|frame| frame.name == name)
    }

    /// The `actionReturns` list, untouched.
    pub fn action_returns(&self) -> &[Value] {
        &self.action_returns
    }

    /// Whether the primary agent's last action succeeded.
    pub fn last_action_success(&self) -> bool {
        self.metadata()
            .is_some_and(AgentMetadata::last_action_success)
    }

    /// The primary agent's error code, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.metadata().and_then(AgentMetadata::error_code)
    }

    /// The primary agent's error message, or the empty string.
    pub fn error_message(&self) -> &str {
        self.metadata()
            .map(AgentMetadata::error_message)
            .unwrap_or_default()
    }

    /// Decide whether this event must be raised to the caller.
    ///
    /// An invalid-action code always raises, regardless of `strict`. A
    /// failed action raises only when `strict` is set.
    pub fn classify(&self, strict: bool) -> Result<(), EventError> {
        if self.error_code() == Some(INVALID_ACTION) {
            return Err(EventError::InvalidAction {
                message: self.error_message().to_owned(),
            });
        }
        if strict && !self.last_action_success() {
            return Err(EventError::ActionFailed {
                code: self.error_code().map(str::to_owned),
                message: self.error_message().to_owned(),
            });
        }
        Ok(())
    }
}
