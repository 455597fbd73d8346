//! Progress bar utilities for CLI operations
//!
//! Batch progress is driven by registry change notifications rather than by
//! the pipeline itself, so the bar sees exactly what any other observer sees.

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use morph_common::types::FileStatus;
use morph_pipeline::FileRegistry;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Create a simple progress bar with custom message
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}

/// Mirror a running batch onto `pb` until the returned task is aborted.
///
/// Position counts files that reached a terminal state after `since`; the
/// message names whichever file is currently processing.
pub fn track_batch(
    registry: Arc<FileRegistry>,
    pb: ProgressBar,
    since: DateTime<Utc>,
) -> JoinHandle<()> {
    let mut changes = registry.subscribe();

    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let Ok(files) = registry.snapshot() else {
                break;
            };

            let finished = files
                .iter()
                .filter(|f| f.updated_at >= since)
                .filter(|f| matches!(f.status(), FileStatus::Completed | FileStatus::Failed))
                .count();
            pb.set_position(finished as u64);

            if let Some(current) = files.iter().find(|f| f.status() == FileStatus::Processing) {
                pb.set_message(format!("Migrating {}", current.path));
            }
        }
    })
}
