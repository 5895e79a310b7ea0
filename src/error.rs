//! Error types for the screening engine

use thiserror::Error;

/// Errors that can occur while processing a screening session
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("Frame timestamp is required")]
    MissingTimestamp,

    #[error("Frame timestamp must be finite, got {0}")]
    InvalidTimestamp(f64),

    #[error("Frame timestamp went backwards: {current} < {previous}")]
    NonMonotonicTimestamp { previous: f64, current: f64 },

    #[error("Failed to decode frame: {0}")]
    FrameDecode(String),

    #[error("Landmark {index} missing (set has {available} points)")]
    MissingLandmark { index: usize, available: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Session already exists: {0}")]
    SessionExists(String),

    #[error("Session registry lock poisoned")]
    RegistryPoisoned,

    #[error("Unsupported recorded frame schema '{0}'")]
    UnsupportedSchema(String),

    #[error("Failed to parse recorded frames: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
