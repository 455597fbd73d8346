//! `morph migrate` command implementation
//!
//! Imports a source (or the built-in sample), runs one or more batch passes,
//! prints the outcome, and optionally writes every artifact to disk:
//!
//! ```text
//! <output>/
//! ├── modern/<path>          rewritten code
//! ├── tests/<path>           generated unit tests
//! ├── docs/<path>.md         migration notes
//! ├── security-report.json   findings keyed by path
//! └── summary.json           per-pass counts and final file states
//! ```

use crate::commands::import_source;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::{files_table, summary_line, FileRow, OutputFormat};
use crate::progress::{create_progress_bar, track_batch};
use crate::MigrateArgs;
use chrono::Utc;
use colored::Colorize;
use morph_common::types::{FileDescriptor, FileStatus, MigrationConfig, SecurityIssue};
use morph_pipeline::{BatchConfig, BatchSummary, StatusCounts, Workspace};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct MigrationReport<'a> {
    source_stack: &'a [String],
    target_stack: &'a [String],
    passes: &'a [BatchSummary],
    counts: StatusCounts,
    files: Vec<FileRow<'a>>,
}

pub async fn run(config: &Config, args: &MigrateArgs) -> Result<()> {
    config.require_api_key()?;
    let migration = migration_config(args)?;
    let quiet = args.format == OutputFormat::Json;

    let batch = BatchConfig::default().with_concurrency(args.concurrency);
    let workspace = config.workspace(batch, args.source.is_none())?;

    match args.source {
        Some(ref source) => {
            let count = import_source(&workspace, source).await?;
            if !quiet {
                println!("{} Found {} file(s) in {}", "✓".green(), count, source.cyan());
            }
        },
        None => {
            if !quiet {
                println!("{} No source given, migrating the built-in sample", "→".cyan());
            }
        },
    }

    if !quiet {
        println!(
            "{} {} {} {}",
            "→".cyan(),
            migration.source_stack(),
            "=>".dimmed(),
            migration.target_stack()
        );
    }

    let passes = run_passes(&workspace, &migration, args.passes.max(1), quiet).await?;
    let files = workspace.snapshot()?;
    let counts = workspace.registry().status_counts()?;

    let report = MigrationReport {
        source_stack: &migration.source_techs,
        target_stack: &migration.target_techs,
        passes: &passes,
        counts,
        files: files.iter().map(FileRow::from).collect(),
    };

    if quiet {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("{}", files_table(&files));
        println!();
        for (i, summary) in passes.iter().enumerate() {
            println!("{}", summary_line(i as u32 + 1, summary));
        }
    }

    if let Some(ref dir) = args.output {
        let written = write_results(dir, &files, &report)?;
        if !quiet {
            println!(
                "{} Wrote {} migrated file(s) to {}",
                "✓".green(),
                written,
                dir.display()
            );
        }
    }

    if counts.failed > 0 {
        return Err(CliError::MigrationFailed(counts.failed));
    }

    Ok(())
}

fn migration_config(args: &MigrateArgs) -> Result<MigrationConfig> {
    let defaults = MigrationConfig::default();
    let source = if args.source_stack.is_empty() {
        defaults.source_techs
    } else {
        args.source_stack.clone()
    };
    let target = if args.target_stack.is_empty() {
        defaults.target_techs
    } else {
        args.target_stack.clone()
    };

    Ok(MigrationConfig::new(source, target)?)
}

async fn run_passes(
    workspace: &Workspace,
    migration: &MigrationConfig,
    passes: u32,
    quiet: bool,
) -> Result<Vec<BatchSummary>> {
    let mut summaries = Vec::new();

    for pass in 1..=passes {
        let eligible = workspace.registry().eligible_paths()?.len();
        if eligible == 0 {
            break;
        }
        if pass > 1 && !quiet {
            println!(
                "{} Retrying {} failed file(s) (pass {}/{})",
                "→".cyan(),
                eligible,
                pass,
                passes
            );
        }

        let pb = create_progress_bar(eligible as u64, "Migrating");
        let tracker = track_batch(Arc::clone(workspace.registry()), pb.clone(), Utc::now());
        let summary = workspace.run_batch(migration).await;
        tracker.abort();
        pb.finish_and_clear();

        let summary = summary?;
        info!(
            pass,
            completed = summary.completed,
            failed = summary.failed,
            "Batch pass finished"
        );
        summaries.push(summary);
    }

    Ok(summaries)
}

/// Write artifacts for every completed file plus both JSON reports.
///
/// Returns how many files had their artifacts written. Paths that would
/// escape `dir` are skipped with a warning.
fn write_results(dir: &Path, files: &[FileDescriptor], report: &MigrationReport<'_>) -> Result<usize> {
    fs::create_dir_all(dir)?;

    let mut findings: BTreeMap<&str, &[SecurityIssue]> = BTreeMap::new();
    let mut written = 0;

    for file in files.iter().filter(|f| f.status() == FileStatus::Completed) {
        let Some(result) = file.result() else {
            continue;
        };
        let Some(relative) = safe_relative_path(&file.path) else {
            warn!(path = %file.path, "Skipping file with unsafe output path");
            continue;
        };

        write_file(&dir.join("modern").join(&relative), &result.modern_code)?;
        write_file(&dir.join("tests").join(&relative), &result.unit_tests)?;

        let mut doc_name = relative.into_os_string();
        doc_name.push(".md");
        write_file(&dir.join("docs").join(doc_name), &result.documentation)?;

        findings.insert(&file.path, &result.security_report);
        written += 1;
    }

    write_file(
        &dir.join("security-report.json"),
        &serde_json::to_string_pretty(&findings)?,
    )?;
    write_file(&dir.join("summary.json"), &serde_json::to_string_pretty(report)?)?;

    Ok(written)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

/// `path` as a relative path made only of normal components
fn safe_relative_path(path: &str) -> Option<PathBuf> {
    let candidate = Path::new(path);
    let mut components = candidate.components().peekable();
    components.peek()?;

    if components.all(|c| matches!(c, Component::Normal(_))) {
        Some(candidate.to_path_buf())
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use morph_common::types::{MigrationState, Severity, TransformResult};
    use tempfile::TempDir;

    fn completed(path: &str) -> FileDescriptor {
        let mut file = FileDescriptor::with_content(path, "class Legacy {}");
        file.transition(MigrationState::Processing).unwrap();
        file.transition(MigrationState::Completed(TransformResult {
            modern_code: format!("// modern {}", path),
            unit_tests: format!("// tests {}", path),
            documentation: format!("# {}", path),
            security_report: vec![SecurityIssue {
                severity: Severity::Medium,
                description: "CSRF disabled".to_string(),
                remediation: "Enable CSRF protection".to_string(),
            }],
        }))
        .unwrap();
        file
    }

    fn args(source_stack: &[&str], target_stack: &[&str]) -> MigrateArgs {
        MigrateArgs {
            source: None,
            source_stack: source_stack.iter().map(|s| s.to_string()).collect(),
            target_stack: target_stack.iter().map(|s| s.to_string()).collect(),
            concurrency: 1,
            passes: 1,
            output: None,
            format: OutputFormat::Table,
        }
    }

    #[test]
    fn test_migration_config_defaults_and_overrides() {
        let config = migration_config(&args(&[], &[])).unwrap();
        assert_eq!(config, MigrationConfig::default());

        let config = migration_config(&args(&["Struts 1"], &[])).unwrap();
        assert_eq!(config.source_techs, vec!["Struts 1"]);
        assert_eq!(config.target_techs, MigrationConfig::default().target_techs);

        assert!(migration_config(&args(&["Java 8", " "], &[])).is_err());
    }

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(
            safe_relative_path("src/main/App.java"),
            Some(PathBuf::from("src/main/App.java"))
        );
        assert_eq!(safe_relative_path("../etc/passwd"), None);
        assert_eq!(safe_relative_path("/etc/passwd"), None);
        assert_eq!(safe_relative_path("src/../../x"), None);
        assert_eq!(safe_relative_path(""), None);
    }

    #[test]
    fn test_write_results() {
        let dir = TempDir::new().unwrap();
        let mut failed = FileDescriptor::with_content("src/Broken.java", "class Broken {}");
        failed.transition(MigrationState::Processing).unwrap();
        failed.fail("model overloaded").unwrap();

        let files = vec![completed("src/App.java"), completed("../Escape.java"), failed];
        let report = MigrationReport {
            source_stack: &[],
            target_stack: &[],
            passes: &[],
            counts: StatusCounts::default(),
            files: files.iter().map(FileRow::from).collect(),
        };

        let written = write_results(dir.path(), &files, &report).unwrap();

        assert_eq!(written, 1);
        let root = dir.path();
        assert_eq!(
            fs::read_to_string(root.join("modern/src/App.java")).unwrap(),
            "// modern src/App.java"
        );
        assert_eq!(
            fs::read_to_string(root.join("tests/src/App.java")).unwrap(),
            "// tests src/App.java"
        );
        assert_eq!(
            fs::read_to_string(root.join("docs/src/App.java.md")).unwrap(),
            "# src/App.java"
        );
        assert!(!root.join("modern/src/Broken.java").exists());
        assert!(!dir.path().parent().unwrap().join("modern/Escape.java").exists());

        let findings: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(root.join("security-report.json")).unwrap())
                .unwrap();
        assert_eq!(findings["src/App.java"][0]["severity"], "MEDIUM");
        assert!(findings.get("../Escape.java").is_none());

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(root.join("summary.json")).unwrap()).unwrap();
        assert_eq!(summary["files"].as_array().unwrap().len(), 3);
        assert_eq!(summary["files"][2]["error"], "model overloaded");
    }
}
