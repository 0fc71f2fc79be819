//! Error types for the goldrl core library

use thiserror::Error;

/// Core error type for environment and emulator operations
#[derive(Error, Debug)]
pub enum RLError {
    /// Environment-related errors
    #[error("Environment error: {0}")]
    Environment(String),

    /// The emulator rejected an operation (state load, input, screen capture)
    #[error("Emulator error: {0}")]
    Emulator(String),

    /// Invalid action
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// A plan file could not be decoded or validated
    #[error("Plan error: {0}")]
    Plan(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected size
        expected: usize,
        /// Size actually observed
        actual: usize,
    },

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for goldrl operations
pub type Result<T> = std::result::Result<T, RLError>;
