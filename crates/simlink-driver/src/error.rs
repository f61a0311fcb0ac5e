//! Error types for the driver binary.
//!
//! [`DriverError`] is the top-level error type that wraps all possible
//! failure modes during session startup and the action loop.

/// Top-level error for the driver binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: simlink_core::ConfigError,
    },

    /// The controller failed to start, step, or stop.
    #[error("controller error: {source}")]
    Controller {
        /// The underlying controller error.
        #[from]
        source: simlink_core::ControllerError,
    },

    /// Reading actions from stdin failed.
    #[error("stdin error: {source}")]
    Stdin {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A step summary could not be rendered.
    #[error("output error: {source}")]
    Output {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}
