//! `morph scan` command implementation
//!
//! Lists the files a source contributes without transforming anything.

use crate::commands::import_source;
use crate::config::Config;
use crate::error::Result;
use crate::output::{display_files, OutputFormat};
use colored::Colorize;
use morph_pipeline::BatchConfig;

pub async fn run(config: &Config, source: &str, format: OutputFormat) -> Result<()> {
    let workspace = config.workspace(BatchConfig::default(), false)?;
    let count = import_source(&workspace, source).await?;

    if format == OutputFormat::Table {
        println!("{} Found {} file(s) in {}", "✓".green(), count, source.cyan());
    }

    display_files(&workspace.snapshot()?, format)
}
