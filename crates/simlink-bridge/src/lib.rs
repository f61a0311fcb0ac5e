//! Exchange bridge for a turn-based simulation session.
//!
//! This crate provides the Axum HTTP server the simulation process calls
//! back into once per frame:
//!
//! - **Health endpoint** (`GET /ping`) returning a fixed `pong`
//! - **Exchange endpoint** (`POST /train`) that accepts one frame's
//!   metadata, hands the resulting [`Event`](simlink_types::Event) to the
//!   control side, and answers with the next queued
//!   [`Action`](simlink_types::Action)
//!
//! # Architecture
//!
//! The control side and the HTTP handler task never share anything but
//! the two single-slot [`Handoff`] channels owned by [`BridgeServer`].
//! Ordering is enforced by the strictly increasing sequence id and by the
//! single-slot discipline; one exchange runs at a time per session.

pub mod bridge;
pub mod error;
pub mod form;
pub mod handlers;
pub mod handoff;
pub mod router;
pub mod server;
pub mod startup;

// Re-export primary types for convenience.
pub use bridge::{BridgeServer, ExchangeRequest};
pub use error::ExchangeError;
pub use handoff::{Handoff, HandoffError};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{BridgeHandle, StartupError, spawn_bridge};
