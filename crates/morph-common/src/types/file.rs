use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::language::Language;
use super::migration::TransformResult;
use crate::error::{MorphError, Result};

/// Payload-free view of a file's migration state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Migration lifecycle of a single file.
///
/// ```text
/// Pending ──► Processing ──► Completed
///                 │  ▲
///                 ▼  │
///                Failed
/// ```
///
/// The result only exists inside `Completed` and the diagnostic only inside
/// `Failed`, so neither can outlive the state it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationState {
    #[default]
    Pending,
    Processing,
    Completed(TransformResult),
    Failed { error: String },
}

impl MigrationState {
    pub fn status(&self) -> FileStatus {
        match self {
            MigrationState::Pending => FileStatus::Pending,
            MigrationState::Processing => FileStatus::Processing,
            MigrationState::Completed(_) => FileStatus::Completed,
            MigrationState::Failed { .. } => FileStatus::Failed,
        }
    }

    /// Whether the state machine permits moving to `next`
    pub fn can_transition_to(&self, next: &MigrationState) -> bool {
        matches!(
            (self.status(), next.status()),
            (FileStatus::Pending, FileStatus::Processing)
                | (FileStatus::Failed, FileStatus::Processing)
                | (FileStatus::Processing, FileStatus::Completed)
                | (FileStatus::Processing, FileStatus::Failed)
        )
    }
}

/// One unit of migration work, keyed by its project-relative path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Unique key within a workspace
    pub path: String,

    /// Original source text; `None` until loaded
    pub content: Option<String>,

    /// Where to fetch `content` from when it is not loaded yet
    pub remote_location: Option<String>,

    pub language: Language,

    pub state: MigrationState,

    /// Last time the state or content changed
    pub updated_at: DateTime<Utc>,
}

impl FileDescriptor {
    /// A pending file whose content is already known
    pub fn with_content(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            language: Language::from_path(&path),
            path,
            content: Some(content.into()),
            remote_location: None,
            state: MigrationState::Pending,
            updated_at: Utc::now(),
        }
    }

    /// A pending file whose content will be fetched lazily from `location`
    pub fn remote(path: impl Into<String>, location: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            language: Language::from_path(&path),
            path,
            content: None,
            remote_location: Some(location.into()),
            state: MigrationState::Pending,
            updated_at: Utc::now(),
        }
    }

    pub fn status(&self) -> FileStatus {
        self.state.status()
    }

    pub fn result(&self) -> Option<&TransformResult> {
        match &self.state {
            MigrationState::Completed(result) => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            MigrationState::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Pending and failed files are picked up by a batch run
    pub fn is_eligible(&self) -> bool {
        matches!(self.status(), FileStatus::Pending | FileStatus::Failed)
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(&mut self, next: MigrationState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(MorphError::InvalidTransition {
                path: self.path.clone(),
                from: self.status(),
                to: next.status(),
            });
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Shorthand for a transition into `Failed`
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.transition(MigrationState::Failed {
            error: error.into(),
        })
    }

    pub fn set_content(&mut self, content: String) {
        self.content = Some(content);
        self.updated_at = Utc::now();
    }
}
