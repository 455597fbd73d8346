//! Error types for the CodeMorph CLI
//!
//! Every variant is user-facing: the message says what went wrong and what
//! to try next.

use morph_common::MorphError;
use morph_pipeline::{DiscoveryError, RegistryError, TransformError, WorkspaceError};
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Source file or archive is missing
    #[error("File not found: '{0}'. Verify the path exists and you have read permissions.")]
    FileNotFound(String),

    /// No key for the transformation service
    #[error("No Gemini API key configured. Pass --api-key or set GEMINI_API_KEY (a .env file works too).")]
    MissingApiKey,

    /// Discovery of the requested source failed
    #[error("Could not read source: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Workspace command failed
    #[error("{0}")]
    Workspace(WorkspaceError),

    /// File exists but its content could not be loaded
    #[error("No content available for '{0}'. Run with --verbose to see why the fetch failed.")]
    ContentUnavailable(String),

    /// Some files ended the run in the failed state
    #[error("{0} file(s) failed to migrate. Re-run 'morph migrate' (or pass --passes) to retry them.")]
    MigrationFailed(usize),

    /// Invalid flag or environment value
    #[error("Configuration error: {0}. Check your flags and MORPH_* environment variables.")]
    Config(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<WorkspaceError> for CliError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::Discovery(e) => Self::Discovery(e),
            other => Self::Workspace(other),
        }
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        Self::Workspace(WorkspaceError::Registry(err))
    }
}

impl From<MorphError> for CliError {
    fn from(err: MorphError) -> Self {
        match err {
            MorphError::Config(msg) => Self::Config(msg),
            MorphError::Io(e) => Self::Io(e),
            other => Self::Other(other.into()),
        }
    }
}

impl From<TransformError> for CliError {
    fn from(err: TransformError) -> Self {
        Self::config(format!("could not set up the Gemini client: {}", err))
    }
}
