//! CodeMorph Pipeline Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Discovery, lazy loading, and batch transformation of legacy source files.
//!
//! # Components
//!
//! - **Discovery**: zip archives, single uploads, and GitHub repositories
//! - **Registry**: the path-ordered, observable file set
//! - **Loader**: single-flight content fetching for remote files
//! - **Transform**: the transformation client seam and its Gemini backend
//! - **Pipeline**: batch runs over every pending or failed file
//! - **Workspace**: the command surface over all of the above
//!
//! # Example
//!
//! ```no_run
//! use morph_common::types::MigrationConfig;
//! use morph_pipeline::transform::GeminiClient;
//! use morph_pipeline::workspace::Workspace;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GeminiClient::new(std::env::var("GEMINI_API_KEY")?)?;
//!     let workspace = Workspace::builder()
//!         .transformation_client(Arc::new(client))
//!         .build()?;
//!
//!     workspace.import_repository("https://github.com/acme/legacy-billing").await?;
//!     let summary = workspace.run_batch(&MigrationConfig::default()).await?;
//!     println!("{} completed, {} failed", summary.completed, summary.failed);
//!     Ok(())
//! }
//! ```

pub mod discovery;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod registry;
pub mod transform;
pub mod workspace;

pub use error::{
    DiscoveryError, FetchError, PipelineError, RegistryError, TransformError, WorkspaceError,
};
pub use pipeline::{
    BatchConfig, BatchSummary, ExecutionStrategy, MigrationPipeline, INTERRUPTED_ERROR,
};
pub use registry::{FileRegistry, StatusCounts};
pub use workspace::Workspace;
