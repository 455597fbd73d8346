//! Error types for CodeMorph

use thiserror::Error;

use crate::types::FileStatus;

/// Result type alias for CodeMorph operations
pub type Result<T> = std::result::Result<T, MorphError>;

/// Main error type shared by the workspace
#[derive(Error, Debug)]
pub enum MorphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state transition for '{path}': {from} -> {to}")]
    InvalidTransition {
        path: String,
        from: FileStatus,
        to: FileStatus,
    },
}

impl MorphError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
