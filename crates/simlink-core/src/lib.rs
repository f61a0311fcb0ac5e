//! Control side of a simlink session.
//!
//! This crate owns the step loop that drives the simulation one action at
//! a time, plus the collaborators a session needs around it.
//!
//! # Modules
//!
//! - [`controller`] -- [`Controller`] step loop and its
//!   [`StepState`] machine.
//! - [`config`] -- Configuration loading from `simlink-config.yaml` into
//!   strongly-typed structs.
//! - [`launcher`] -- Simulation command line and process spawning.
//! - [`navigation`] -- Planar distance and grid-point keys.
//! - [`scenes`] -- Catalog of scene names the simulation ships with.

pub mod config;
pub mod controller;
pub mod launcher;
pub mod navigation;
pub mod scenes;

pub use config::{ConfigError, LoggingConfig, SimlinkConfig};
pub use controller::{Controller, ControllerConfig, ControllerError, StepState};
pub use launcher::{BridgeEndpoint, LaunchConfig, LaunchError, Quality, SimulationProcess};
