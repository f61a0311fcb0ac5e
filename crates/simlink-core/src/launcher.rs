//! Launching the simulation process.
//!
//! The simulation is an external executable. [`LaunchConfig::command`]
//! builds its command line (window size, fullscreen flag, render quality)
//! and [`LaunchConfig::spawn`] starts it with the bridge address and token
//! in its environment so it knows where to post frames.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tracing::info;

/// Environment variable carrying the bridge host.
pub const HOST_ENV: &str = "SIMLINK_HOST";
/// Environment variable carrying the bridge port.
pub const PORT_ENV: &str = "SIMLINK_PORT";
/// Environment variable carrying the client token.
pub const TOKEN_ENV: &str = "SIMLINK_CLIENT_TOKEN";

/// Errors launching the simulation process.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// No executable path is configured.
    #[error("no simulation executable configured")]
    MissingExecutable,

    /// The quality name is not one the simulation knows.
    #[error("unknown quality setting: {0}")]
    UnknownQuality(String),

    /// The process could not be started.
    #[error("failed to start {path}: {source}")]
    Spawn {
        /// The executable that failed to start.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The process could not be stopped.
    #[error("failed to stop simulation process: {0}")]
    Kill(std::io::Error),
}

/// Render quality presets understood by the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    /// Level 1.
    #[serde(rename = "Very Low")]
    VeryLow,
    /// Level 2.
    Low,
    /// Level 3.
    Medium,
    /// Level 4.
    MediumCloseFitShadows,
    /// Level 5.
    High,
    /// Level 6.
    #[serde(rename = "Very High")]
    VeryHigh,
    /// Level 7.
    #[default]
    Ultra,
    /// Level 8.
    #[serde(rename = "High WebGL")]
    HighWebGl,
}

impl Quality {
    /// The numeric level passed as `-screen-quality`.
    pub const fn level(self) -> u8 {
        match self {
            Self::VeryLow => 1,
            Self::Low => 2,
            Self::Medium => 3,
            Self::MediumCloseFitShadows => 4,
            Self::High => 5,
            Self::VeryHigh => 6,
            Self::Ultra => 7,
            Self::HighWebGl => 8,
        }
    }
}

impl FromStr for Quality {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Very Low" => Ok(Self::VeryLow),
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "MediumCloseFitShadows" => Ok(Self::MediumCloseFitShadows),
            "High" => Ok(Self::High),
            "Very High" => Ok(Self::VeryHigh),
            "Ultra" => Ok(Self::Ultra),
            "High WebGL" => Ok(Self::HighWebGl),
            other => Err(LaunchError::UnknownQuality(other.to_owned())),
        }
    }
}

/// Where the simulation should post its frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEndpoint {
    /// Bound address of the bridge server.
    pub addr: SocketAddr,
    /// Client token the simulation must present, if any.
    pub token: Option<String>,
}

/// How to start the simulation process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LaunchConfig {
    /// Path to the simulation executable.
    #[serde(default)]
    pub executable_path: PathBuf,

    /// Window width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Window height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Whether to run fullscreen.
    #[serde(default)]
    pub fullscreen: bool,

    /// Render quality preset.
    #[serde(default)]
    pub quality: Quality,

    /// Run without a window (`-batchmode -nographics`).
    #[serde(default)]
    pub headless: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            executable_path: PathBuf::new(),
            width: default_width(),
            height: default_height(),
            fullscreen: false,
            quality: Quality::default(),
            headless: false,
        }
    }
}

const fn default_width() -> u32 {
    300
}

const fn default_height() -> u32 {
    300
}

impl LaunchConfig {
    /// Build the simulation command line; the first element is the
    /// executable.
    pub fn command(&self, width: u32, height: u32, headless: bool) -> Vec<String> {
        let mut command = vec![
            self.executable_path.display().to_string(),
            "-screen-fullscreen".to_owned(),
            if self.fullscreen { "1" } else { "0" }.to_owned(),
            "-screen-quality".to_owned(),
            self.quality.level().to_string(),
            "-screen-width".to_owned(),
            width.to_string(),
            "-screen-height".to_owned(),
            height.to_string(),
        ];
        if headless {
            command.push("-batchmode".to_owned());
            command.push("-nographics".to_owned());
        }
        command
    }

    /// Start the simulation process, pointing it at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::MissingExecutable`] if no executable is
    /// configured, or [`LaunchError::Spawn`] if the process cannot start.
    pub fn spawn(&self, endpoint: &BridgeEndpoint) -> Result<SimulationProcess, LaunchError> {
        if self.executable_path.as_os_str().is_empty() {
            return Err(LaunchError::MissingExecutable);
        }
        let command = self.command(self.width, self.height, self.headless);
        let Some((program, args)) = command.split_first() else {
            return Err(LaunchError::MissingExecutable);
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env(HOST_ENV, endpoint.addr.ip().to_string())
            .env(PORT_ENV, endpoint.addr.port().to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(token) = &endpoint.token {
            cmd.env(TOKEN_ENV, token);
        }

        let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            path: program.clone(),
            source,
        })?;
        info!(
            executable = %program,
            pid = child.id(),
            bridge = %endpoint.addr,
            "Simulation process started"
        );
        Ok(SimulationProcess { child })
    }
}

/// A running simulation process. Killed when dropped.
#[derive(Debug)]
pub struct SimulationProcess {
    child: Child,
}

impl SimulationProcess {
    /// OS process id, if the process is still running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Whether the process has exited.
    pub fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    /// Kill the process and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Kill`] if the signal cannot be delivered.
    pub async fn kill(&mut self) -> Result<(), LaunchError> {
        self.child.kill().await.map_err(LaunchError::Kill)
    }
}
