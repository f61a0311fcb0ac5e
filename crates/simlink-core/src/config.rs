//! Configuration loading and typed config structures for simlink sessions.
//!
//! The canonical configuration lives in `simlink-config.yaml` next to the
//! driver binary. Every section and field is defaulted, so an empty file
//! (or no file at all) yields a working loopback session with a
//! default-quality window.
//!
//! Environment overrides are applied by the binary through
//! [`SimlinkConfig::apply_overrides`], which takes a lookup function
//! instead of reading the process environment itself.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use simlink_bridge::ServerConfig;

use crate::controller::ControllerConfig;
use crate::launcher::LaunchConfig;

/// Override for [`ControllerConfig::visibility_distance`].
pub const VISIBILITY_DISTANCE_ENV: &str = "SIMLINK_VISIBILITY_DISTANCE";
/// Override for [`LaunchConfig::executable_path`].
pub const EXECUTABLE_ENV: &str = "SIMLINK_EXECUTABLE";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An override value could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidOverride {
        /// The override variable.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level session configuration.
///
/// Mirrors the structure of `simlink-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimlinkConfig {
    /// Where the bridge listens.
    #[serde(default)]
    pub server: ServerConfig,

    /// How the simulation process is started.
    #[serde(default)]
    pub launch: LaunchConfig,

    /// Controller defaults (initialization, overrides, first scene).
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimlinkConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string. An empty document yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Apply overrides looked up by variable name, typically
    /// `|name| std::env::var(name).ok()`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if the visibility distance
    /// override is not a non-negative number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(VISIBILITY_DISTANCE_ENV) {
            let distance = value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite() && *d >= 0.0)
                .ok_or_else(|| ConfigError::InvalidOverride {
                    name: VISIBILITY_DISTANCE_ENV,
                    value: value.clone(),
                })?;
            self.controller.visibility_distance = Some(distance);
        }
        if let Some(value) = lookup(EXECUTABLE_ENV).filter(|v| !v.is_empty()) {
            self.launch.executable_path = PathBuf::from(value);
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error) used when
    /// `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::launcher::Quality;

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "0.0.0.0"
  port: 8200
launch:
  executable_path: "/opt/sim/build.x86_64"
  width: 640
  height: 480
  fullscreen: true
  quality: "Very High"
  headless: true
controller:
  visibility_distance: 1.5
  grid_size: 0.25
  agent_count: 2
  scene: "FloorPlan28"
logging:
  level: "debug"
  json: true
"#;
        let config = SimlinkConfig::parse(yaml);
        assert!(config.is_ok(), "failed to parse: {config:?}");
        let Ok(config) = config else { return };

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8200);
        assert_eq!(
            config.launch.executable_path,
            PathBuf::from("/opt/sim/build.x86_64")
        );
        assert_eq!(config.launch.width, 640);
        assert_eq!(config.launch.height, 480);
        assert!(config.launch.fullscreen);
        assert_eq!(config.launch.quality, Quality::VeryHigh);
        assert!(config.launch.headless);
        assert_eq!(config.controller.visibility_distance, Some(1.5));
        assert_eq!(config.controller.grid_size, Some(0.25));
        assert_eq!(config.controller.agent_count, Some(2));
        assert_eq!(config.controller.scene.as_deref(), Some("FloorPlan28"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SimlinkConfig::parse("launch:\n  quality: Low\n");
        assert!(config.is_ok(), "failed to parse: {config:?}");
        let Ok(config) = config else { return };

        assert_eq!(config.launch.quality, Quality::Low);
        assert_eq!(config.launch.width, 300);
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_empty_yaml() {
        let config = SimlinkConfig::parse("");
        assert!(config.is_ok_and(|c| c == SimlinkConfig::default()));
    }

    #[test]
    fn unknown_quality_is_rejected() {
        let config = SimlinkConfig::parse("launch:\n  quality: Cinematic\n");
        assert!(matches!(config, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn load_from_repo_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("simlink-config.yaml");
        let config = SimlinkConfig::from_file(&path);
        assert!(config.is_ok(), "failed to load {}: {config:?}", path.display());
    }

    #[test]
    fn missing_file_is_io_error() {
        let config = SimlinkConfig::from_file(Path::new("/nonexistent/simlink-config.yaml"));
        assert!(matches!(config, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = [
            (VISIBILITY_DISTANCE_ENV, "2.0"),
            (EXECUTABLE_ENV, "/tmp/sim"),
        ]
        .into_iter()
        .collect();

        let mut config = SimlinkConfig::default();
        let result = config.apply_overrides(|name| vars.get(name).map(|v| (*v).to_owned()));

        assert!(result.is_ok());
        assert_eq!(config.controller.visibility_distance, Some(2.0));
        assert_eq!(config.launch.executable_path, PathBuf::from("/tmp/sim"));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let mut config = SimlinkConfig::default();
        let result = config.apply_overrides(|name| {
            (name == VISIBILITY_DISTANCE_ENV).then(|| "far".to_owned())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidOverride {
                name: VISIBILITY_DISTANCE_ENV,
                ..
            })
        ));
        assert_eq!(config.controller.visibility_distance, None);
    }

    #[test]
    fn absent_overrides_change_nothing() {
        let mut config = SimlinkConfig::default();
        assert!(config.apply_overrides(|_| None).is_ok());
        assert_eq!(config, SimlinkConfig::default());
    }
}
