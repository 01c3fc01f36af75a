//! Error types for the temperature bridge
//!
//! Each subsystem owns its error enum; `BridgeError` is the umbrella used at
//! the binary boundary.

use thiserror::Error;

/// Main error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] crate::jobs::SchedulerError),

    #[error("Supervisor error: {0}")]
    Supervisor(#[from] crate::bridge::SupervisorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
