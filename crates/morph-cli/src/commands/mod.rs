//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod migrate;
pub mod scan;
pub mod show;

use crate::error::{CliError, Result};
use crate::progress::create_spinner;
use morph_pipeline::discovery::SourceKind;
use morph_pipeline::Workspace;
use std::path::Path;
use tracing::debug;

/// Discover `source` into the workspace, returning how many files it holds
pub async fn import_source(workspace: &Workspace, source: &str) -> Result<usize> {
    let kind = SourceKind::detect(source);
    debug!(source = %source, kind = ?kind, "Importing source");

    let spinner = create_spinner(&format!("Discovering files in {}...", source));
    let imported = match kind {
        SourceKind::Repository => workspace.import_repository(source).await.map_err(CliError::from),
        SourceKind::RemoteArchive => workspace.import_archive_url(source).await.map_err(CliError::from),
        SourceKind::Archive => match read_source(source).await {
            Ok(bytes) => workspace.import_archive(&bytes).map_err(CliError::from),
            Err(e) => Err(e),
        },
        SourceKind::File => match read_source(source).await {
            Ok(bytes) => {
                let file_name = Path::new(source)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| source.to_string());
                workspace.import_upload(&file_name, &bytes).map_err(CliError::from)
            },
            Err(e) => Err(e),
        },
    };
    spinner.finish_and_clear();

    imported
}

async fn read_source(source: &str) -> Result<Vec<u8>> {
    match tokio::fs::read(source).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::FileNotFound(source.to_string()))
        },
        Err(e) => Err(e.into()),
    }
}
