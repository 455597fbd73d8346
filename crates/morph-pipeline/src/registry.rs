//! In-memory file registry
//!
//! The single source of truth for every file in a workspace. Entries are
//! keyed by path and iterated in ascending byte-wise path order, which is
//! also the order a batch run processes them in.
//!
//! The registry holds no policy: it stores descriptors, applies one mutation
//! to one entry at a time, and tells subscribers that something changed.

use chrono::{DateTime, Utc};
use morph_common::types::{FileDescriptor, FileStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::RegistryError;

/// Number of files in each lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }
}

/// Path-keyed collection of file descriptors
pub struct FileRegistry {
    files: RwLock<BTreeMap<String, FileDescriptor>>,
    revision: watch::Sender<u64>,
}

impl FileRegistry {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            files: RwLock::new(BTreeMap::new()),
            revision,
        }
    }

    /// Discard every entry and install `descriptors`.
    ///
    /// Paths must be unique; when they are not, the last descriptor for a
    /// path wins and each overwritten duplicate is logged. Returns the number
    /// of entries installed.
    pub fn replace_all(
        &self,
        descriptors: impl IntoIterator<Item = FileDescriptor>,
    ) -> Result<usize, RegistryError> {
        let mut incoming = BTreeMap::new();
        for descriptor in descriptors {
            let path = descriptor.path.clone();
            if incoming.insert(path.clone(), descriptor).is_some() {
                warn!(path = %path, "Duplicate path in discovered file set; keeping the last entry");
            }
        }

        let installed = incoming.len();
        *self.write()? = incoming;
        self.bump();

        debug!(files = installed, "Registry replaced");
        Ok(installed)
    }

    /// Apply `mutator` to the descriptor at `path`.
    ///
    /// A missing path is a silent miss (`Ok(None)`): it points at a stale
    /// reference upstream but must not disturb the caller's control flow.
    /// Subscribers are notified only when the mutator actually changed the
    /// descriptor; a rejected transition leaves the revision alone.
    pub fn upsert<R>(
        &self,
        path: &str,
        mutator: impl FnOnce(&mut FileDescriptor) -> R,
    ) -> Result<Option<R>, RegistryError> {
        let outcome = {
            let mut files = self.write()?;
            files.get_mut(path).map(|file| {
                let before = ChangeMarker::of(file);
                let value = mutator(file);
                (value, ChangeMarker::of(file) != before)
            })
        };

        match outcome {
            Some((value, changed)) => {
                if changed {
                    self.bump();
                }
                Ok(Some(value))
            },
            None => {
                debug!(path = %path, "Update for unknown path ignored");
                Ok(None)
            },
        }
    }

    /// Snapshot of the descriptor at `path`
    pub fn get(&self, path: &str) -> Result<Option<FileDescriptor>, RegistryError> {
        Ok(self.read()?.get(path).cloned())
    }

    pub fn contains(&self, path: &str) -> Result<bool, RegistryError> {
        Ok(self.read()?.contains_key(path))
    }

    /// Snapshot of every descriptor, in path order
    pub fn snapshot(&self) -> Result<Vec<FileDescriptor>, RegistryError> {
        Ok(self.read()?.values().cloned().collect())
    }

    pub fn paths(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.read()?.keys().cloned().collect())
    }

    /// Paths of pending and failed files, in path order
    pub fn eligible_paths(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self
            .read()?
            .values()
            .filter(|file| file.is_eligible())
            .map(|file| file.path.clone())
            .collect())
    }

    pub fn status_counts(&self) -> Result<StatusCounts, RegistryError> {
        let mut counts = StatusCounts::default();
        for file in self.read()?.values() {
            match file.status() {
                FileStatus::Pending => counts.pending += 1,
                FileStatus::Processing => counts.processing += 1,
                FileStatus::Completed => counts.completed += 1,
                FileStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }

    pub fn len(&self) -> Result<usize, RegistryError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RegistryError> {
        Ok(self.read()?.is_empty())
    }

    /// Receiver that wakes whenever the registry changes.
    ///
    /// The value is a monotonically increasing revision number.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, FileDescriptor>>, RegistryError> {
        self.files.read().map_err(|_| RegistryError::Poisoned)
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, BTreeMap<String, FileDescriptor>>, RegistryError> {
        self.files.write().map_err(|_| RegistryError::Poisoned)
    }
}

/// What a descriptor mutation can touch: every state transition changes the
/// status, and `set_content` flips content presence. Both refresh `updated_at`.
#[derive(PartialEq)]
struct ChangeMarker {
    status: FileStatus,
    has_content: bool,
    updated_at: DateTime<Utc>,
}

impl ChangeMarker {
    fn of(file: &FileDescriptor) -> Self {
        Self {
            status: file.status(),
            has_content: file.has_content(),
            updated_at: file.updated_at,
        }
    }
}

impl Default for FileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<FileDescriptor> for FileRegistry {
    fn from_iter<I: IntoIterator<Item = FileDescriptor>>(iter: I) -> Self {
        let files: BTreeMap<_, _> = iter
            .into_iter()
            .map(|file| (file.path.clone(), file))
            .collect();
        let (revision, _) = watch::channel(0);
        Self {
            files: RwLock::new(files),
            revision,
        }
    }
}
