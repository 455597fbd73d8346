//! `morph show` command implementation

use crate::commands::import_source;
use crate::config::Config;
use crate::error::{CliError, Result};
use morph_pipeline::BatchConfig;

/// Print the original content of `path`, fetching it if it is remote
pub async fn run(config: &Config, source: &str, path: &str) -> Result<()> {
    let workspace = config.workspace(BatchConfig::default(), false)?;
    import_source(&workspace, source).await?;

    let file = workspace.select_file(path).await?;
    let content = file
        .content
        .ok_or_else(|| CliError::ContentUnavailable(path.to_string()))?;

    print!("{}", content);
    if !content.ends_with('\n') {
        println!();
    }

    Ok(())
}
