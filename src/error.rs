//! Error types for headtrack

use thiserror::Error;

/// Main error type for headtrack
#[derive(Error, Debug)]
pub enum HeadtrackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Tracking-related errors (collaborators + worker lifecycle)
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Frame source error: {0}")]
    FrameSource(String),

    #[error("Detector error: {0}")]
    Detector(String),

    #[error("Pose solver error: {0}")]
    Solver(String),

    #[error("Collaborator panicked: {0}")]
    Panicked(String),

    #[error("Failed to spawn tracking worker: {0}")]
    Spawn(String),
}

/// Result type alias for headtrack operations
pub type Result<T> = std::result::Result<T, HeadtrackError>;
