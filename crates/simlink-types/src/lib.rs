//! Shared type definitions for the simlink bridge.
//!
//! This crate is the single source of truth for the values that cross
//! the boundary between the control process and the simulation process.
//! Everything here is plain data plus validation; nothing blocks and
//! nothing performs I/O.
//!
//! # Modules
//!
//! - [`ids`] -- The per-session [`SequenceId`] counter value
//! - [`params`] -- Open parameter payloads, including numeric-library
//!   wrapped scalars and arrays ([`NdArray`])
//! - [`actions`] -- Typed [`Action`] variants and their wire translation
//! - [`event`] -- Normalized per-frame [`Event`] and its classification
//! - [`point`] -- Simple 3D point used by agent metadata

pub mod actions;
pub mod event;
pub mod ids;
pub mod params;
pub mod point;

// Re-export all public types at crate root for convenience.
pub use actions::{
    Action, ActionError, CustomAction, InitializeParams, LookParams, MoveParams, ResetParams,
    RotateParams,
};
pub use event::{
    AgentMetadata, Event, EventError, FrameBuffer, FrameMetadata, INVALID_ACTION, MetadataError,
    MultiAgentMetadata,
};
pub use ids::SequenceId;
pub use params::{NdArray, ParamValue, Params, Scalar, ShapeError};
pub use point::Point3;
