//! Driver binary for simlink sessions.
//!
//! Wires the bridge, the controller, and the simulation process together,
//! then steps one action per stdin line until input ends.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `simlink-config.yaml` (or the path given as
//!    the first argument) and apply environment overrides
//! 2. Initialize structured logging (tracing) on stderr
//! 3. Create the bridge session with a fresh client token
//! 4. Start the bridge server and launch the simulation process
//! 5. Receive the first frame and initialize (loading the configured scene)
//! 6. Step each action read from stdin, printing one JSON summary per event
//! 7. Stop the simulation and the server

mod commands;
mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use simlink_bridge::BridgeServer;
use simlink_core::{Controller, ControllerError, LoggingConfig, SimlinkConfig};
use simlink_types::Action;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, StepSummary};
use crate::error::DriverError;

/// Default configuration file, relative to the working directory.
const CONFIG_FILE: &str = "simlink-config.yaml";

/// Application entry point for the driver.
///
/// # Errors
///
/// Returns an error if startup fails, stdin cannot be read, or a step
/// fails for a reason other than the simulation rejecting the action.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        host = config.server.host,
        port = config.server.port,
        executable = %config.launch.executable_path.display(),
        quality = ?config.launch.quality,
        "Configuration loaded"
    );

    // 3. Create the bridge session.
    let token = uuid::Uuid::new_v4().to_string();
    let bridge = Arc::new(BridgeServer::new(Some(token)));
    let mut controller = Controller::new(config.controller.clone(), Arc::clone(&bridge));

    // 4-5. Start the server, launch the simulation, initialize.
    controller
        .start(&config.server, &config.launch)
        .await
        .map_err(DriverError::from)?;
    info!(
        addr = ?controller.server_addr(),
        sequence_id = %bridge.sequence_id(),
        "Session initialized"
    );
    print_last(&controller, None)?;

    // 6. Action loop.
    let result = run_actions(&mut controller).await;

    // 7. Shutdown.
    controller.stop().await.map_err(DriverError::from)?;
    result?;
    info!("simlink-driver shutdown complete");
    Ok(())
}

/// Step each stdin line until input ends, `quit` is read, or Ctrl-C.
async fn run_actions(controller: &mut Controller) -> Result<(), DriverError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                return Ok(());
            }
        };
        let Some(line) = line else {
            info!("End of input");
            return Ok(());
        };

        let (action, strict) = match commands::parse_line(&line) {
            Ok(Some(Command::Step { action, strict })) => (action, strict),
            Ok(Some(Command::Quit)) => return Ok(()),
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "ignoring unparseable line");
                continue;
            }
        };

        let outcome = controller.step(action, strict).await.map(|_| ());
        match outcome {
            Ok(()) => print_last(controller, None)?,
            Err(
                e @ (ControllerError::InvalidAction { .. } | ControllerError::ActionFailed { .. }),
            ) => print_last(controller, Some(e.to_string()))?,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Print the summary of the controller's last event on stdout.
fn print_last(controller: &Controller, error: Option<String>) -> Result<(), DriverError> {
    let Some(event) = controller.last_event() else {
        return Ok(());
    };
    let action = controller.last_action().map_or("", Action::name);
    let mut summary = StepSummary::new(action, controller.bridge().sequence_id(), event);
    if let Some(error) = error {
        summary = summary.with_error(error);
    }
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the configured
/// level; stdout is left to step summaries.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the configuration file and apply environment overrides.
///
/// Looks for the file given as the first argument, or `simlink-config.yaml`
/// in the working directory; missing files fall back to defaults.
fn load_config() -> Result<SimlinkConfig, DriverError> {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let mut config = read_config(&path)?;
    config.apply_overrides(|name| std::env::var(name).ok())?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<SimlinkConfig, DriverError> {
    if path.exists() {
        Ok(SimlinkConfig::from_file(path)?)
    } else {
        Ok(SimlinkConfig::default())
    }
}
