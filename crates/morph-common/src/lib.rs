//! CodeMorph Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the CodeMorph workspace.
//!
//! # Overview
//!
//! This crate provides the vocabulary every other workspace member speaks:
//!
//! - **Types**: [`FileDescriptor`](types::FileDescriptor) and its migration
//!   lifecycle, the stack [`MigrationConfig`](types::MigrationConfig), and the
//!   structured [`TransformResult`](types::TransformResult)
//! - **Error Handling**: [`MorphError`] and the crate [`Result`] alias
//! - **Logging**: tracing subscriber setup shared by all binaries
//!
//! # Example
//!
//! ```no_run
//! use morph_common::types::{FileDescriptor, FileStatus, Language};
//!
//! let file = FileDescriptor::with_content("src/App.java", "class App {}");
//! assert_eq!(file.language, Language::Java);
//! assert_eq!(file.status(), FileStatus::Pending);
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{MorphError, Result};
