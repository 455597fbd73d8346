//! Common types used across CodeMorph

mod file;
mod language;
mod migration;
mod sample;

pub use file::{FileDescriptor, FileStatus, MigrationState};
pub use language::Language;
pub use migration::{MigrationConfig, SecurityIssue, Severity, TransformResult};
pub use sample::{sample_workspace_file, SAMPLE_FILE_PATH, SAMPLE_LEGACY_CODE};
