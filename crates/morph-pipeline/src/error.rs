//! Error taxonomy for discovery, content loading, transformation, and batch runs
//!
//! Discovery errors surface once to the caller and leave the registry alone.
//! Fetch and transformation errors never leave a batch: the pipeline turns
//! them into a file's `Failed` state. Only [`RegistryError`] aborts a run.

use std::time::Duration;
use thiserror::Error;

/// The registry's lock was poisoned by a panicking writer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("File registry is corrupted: a writer panicked while holding the lock")]
    Poisoned,
}

/// Failures while producing an initial file set
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Invalid GitHub URL '{0}'. Format: https://github.com/owner/repo")]
    InvalidUrl(String),

    #[error("Repository '{0}' not found or private")]
    NotFound(String),

    #[error("GitHub API rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("GitHub API error: {0}")]
    Api(String),

    #[error("Network request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive download from '{url}' failed with HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("Unreadable archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to read archive entry '{path}': {source}")]
    ArchiveEntry {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while resolving a file's content from its remote location
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {location} failed: {source}")]
    Request {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{location} returned HTTP {status}")]
    Status { location: String, status: u16 },

    #[error("timed out after {}s fetching {location}", after.as_secs())]
    Timeout { location: String, after: Duration },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Failures of a single transformation call
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Source code cannot be empty")]
    EmptySource,

    #[error("Transformation service rate limited the request: {0}")]
    RateLimited(String),

    #[error("Transformation service rejected the credentials: {0}")]
    Authentication(String),

    #[error("Transformation service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    #[error("Transformation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Transformation service blocked the prompt: {0}")]
    Blocked(String),

    #[error("No response generated by the transformation service")]
    EmptyResponse,

    #[error("Malformed transformation payload: {0}")]
    MalformedResponse(String),
}

/// Failures that stop a batch run as a whole
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("A batch run is already in progress")]
    AlreadyRunning,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors surfaced by the workspace commands
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("File '{0}' is not part of the workspace")]
    UnknownFile(String),

    #[error("Failed to set up workspace: {0}")]
    Setup(String),
}
