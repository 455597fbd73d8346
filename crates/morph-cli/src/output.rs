//! Terminal rendering of file listings and run summaries

use crate::error::Result;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use morph_common::types::{FileDescriptor, FileStatus};
use morph_pipeline::BatchSummary;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Compact,
}

/// Serializable view of a descriptor, without file bodies
#[derive(Debug, Serialize)]
pub struct FileRow<'a> {
    pub path: &'a str,
    pub language: &'a str,
    pub status: FileStatus,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_issues: Option<usize>,
}

impl<'a> From<&'a FileDescriptor> for FileRow<'a> {
    fn from(file: &'a FileDescriptor) -> Self {
        Self {
            path: &file.path,
            language: file.language.as_str(),
            status: file.status(),
            loaded: file.has_content(),
            remote_location: file.remote_location.as_deref(),
            error: file.error_message(),
            security_issues: file.result().map(|r| r.security_report.len()),
        }
    }
}

/// Print a file listing in the requested format
pub fn display_files(files: &[FileDescriptor], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!();
            println!("{}", files_table(files));
            println!();
            println!("{} file(s)", files.len());
            Ok(())
        },
        OutputFormat::Json => {
            let rows: Vec<FileRow<'_>> = files.iter().map(FileRow::from).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(())
        },
        OutputFormat::Compact => {
            for file in files {
                println!("{}\t{}\t{}", file.status(), file.language.as_str(), file.path);
            }
            Ok(())
        },
    }
}

/// Table of files with their status and a short note
pub fn files_table(files: &[FileDescriptor]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Path", "Language", "Status", "Notes"]);

    for file in files {
        table.add_row(vec![
            file.path.clone(),
            file.language.as_str().to_string(),
            colored_status(file.status()),
            notes(file),
        ]);
    }

    table
}

/// One-line recap of a batch pass
pub fn summary_line(pass: u32, summary: &BatchSummary) -> String {
    let mut line = format!(
        "Pass {}: {} completed, {} failed",
        pass, summary.completed, summary.failed
    );
    if summary.skipped > 0 {
        line.push_str(&format!(", {} skipped", summary.skipped));
    }
    if summary.cancelled > 0 {
        line.push_str(&format!(", {} cancelled", summary.cancelled));
    }
    line
}

fn colored_status(status: FileStatus) -> String {
    match status {
        FileStatus::Pending => status.as_str().dimmed().to_string(),
        FileStatus::Processing => status.as_str().cyan().to_string(),
        FileStatus::Completed => status.as_str().green().to_string(),
        FileStatus::Failed => status.as_str().red().to_string(),
    }
}

fn notes(file: &FileDescriptor) -> String {
    if let Some(error) = file.error_message() {
        return truncate_string(error, 60);
    }
    if let Some(result) = file.result() {
        return match result.security_report.len() {
            0 => "no security findings".to_string(),
            1 => "1 security finding".to_string(),
            n => format!("{} security findings", n),
        };
    }
    if file.has_content() {
        "-".to_string()
    } else {
        "not loaded".to_string()
    }
}

/// Truncate a string to a maximum number of characters with ellipsis
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
