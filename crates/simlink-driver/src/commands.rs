//! Action lines read from stdin and the summaries printed for each step.
//!
//! Each input line is a JSON object in the wire form of an action
//! (`{"action": "MoveAhead", "moveMagnitude": 0.25}`), optionally carrying
//! a boolean `strict` key that makes a failed action an error. Blank lines
//! and lines starting with `#` are skipped; `quit` or `exit` ends the
//! session.

use serde::Serialize;
use serde_json::Value;
use simlink_types::{Action, ActionError, Event, Point3, SequenceId};

/// Input key selecting strict classification for one step.
pub const STRICT_KEY: &str = "strict";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Send an action and wait for its event.
    Step {
        /// The action to send.
        action: Action,
        /// Whether a failed action is an error.
        strict: bool,
    },
    /// Stop the session.
    Quit,
}

/// Errors parsing an input line.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The line is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The line is JSON but not an object.
    #[error("expected a JSON object")]
    NotAnObject,

    /// The `strict` key is present but not a boolean.
    #[error("`strict` must be a boolean")]
    InvalidStrict,

    /// The object is not a valid action.
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Parse one input line. Returns `Ok(None)` for lines that carry nothing.
pub fn parse_line(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if matches!(line, "quit" | "exit") {
        return Ok(Some(Command::Quit));
    }

    let Value::Object(mut map) = serde_json::from_str::<Value>(line)? else {
        return Err(CommandError::NotAnObject);
    };
    let strict = match map.remove(STRICT_KEY) {
        None => false,
        Some(Value::Bool(strict)) => strict,
        Some(_) => return Err(CommandError::InvalidStrict),
    };
    let action = Action::from_wire(map)?;
    Ok(Some(Command::Step { action, strict }))
}

/// What the driver prints for one step, as a single JSON line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSummary {
    /// The action that produced the event.
    pub action: String,
    /// The sequence id of the frame that carried the event.
    pub sequence_id: SequenceId,
    /// Whether the primary agent's last action succeeded.
    pub last_action_success: bool,
    /// The primary agent's error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// The primary agent's error message.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error_message: String,
    /// The primary agent's position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_position: Option<Point3>,
    /// Number of agents in the frame.
    pub agent_count: usize,
    /// Names of the frame buffers delivered with the event.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<String>,
    /// The pass-through `actionReturns` list.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub action_returns: Vec<Value>,
    /// The error the step surfaced, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepSummary {
    /// Summarize `event`, produced by `action` in frame `sequence_id`.
    pub fn new(action: &str, sequence_id: SequenceId, event: &Event) -> Self {
        Self {
            action: action.to_owned(),
            sequence_id,
            last_action_success: event.last_action_success(),
            error_code: event.error_code().map(str::to_owned),
            error_message: event.error_message().to_owned(),
            agent_position: event.metadata().and_then(|m| m.agent_position()),
            agent_count: event.agents().len(),
            frames: event.frames().iter().map(|f| f.name.clone()).collect(),
            action_returns: event.action_returns().to_vec(),
            error: None,
        }
    }

    /// Attach the error the step surfaced.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
