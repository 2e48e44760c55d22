//! # Error Types
//!
//! Custom error types for SixDoF Relay using `thiserror`.

use thiserror::Error;

/// Main error type for SixDoF Relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Command encoding errors from the recorder
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The relay needs a tokio runtime to spawn its emission task
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// The emission task ended abnormally
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Result type alias for SixDoF Relay
pub type Result<T> = std::result::Result<T, RelayError>;
