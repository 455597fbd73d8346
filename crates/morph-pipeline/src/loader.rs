//! Lazy content loading
//!
//! Repository imports register files by remote location only. Content is
//! fetched on first need, either when the file is selected for viewing or
//! when a batch run reaches it. [`ContentResolver`] makes sure both paths
//! share a single fetch per file and never clobber each other's state.

use async_trait::async_trait;
use morph_common::types::FileStatus;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{FetchError, RegistryError};
use crate::registry::FileRegistry;

/// Default per-fetch timeout
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches raw file content from a remote location
#[async_trait]
pub trait ContentLoader: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<String, FetchError>;
}

/// [`ContentLoader`] backed by plain HTTP GET requests
pub struct HttpContentLoader {
    client: Client,
}

impl HttpContentLoader {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("codemorph/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ContentLoader for HttpContentLoader {
    async fn fetch(&self, location: &str) -> Result<String, FetchError> {
        debug!(location = %location, "Fetching file content");

        let request_error = |source| FetchError::Request {
            location: location.to_string(),
            source,
        };

        let response = self.client.get(location).send().await.map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                location: location.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(request_error)
    }
}

/// Who is asking for content, which decides when it may be written back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// A user opened the file; content is stored only while it is still pending
    Selection,
    /// A batch run owns the file; content is stored only while it is processing
    Pipeline,
}

impl LoadMode {
    fn may_store(self, status: FileStatus) -> bool {
        match self {
            LoadMode::Selection => status == FileStatus::Pending,
            LoadMode::Pipeline => status == FileStatus::Processing,
        }
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Content fetched under a slot, kept for callers queued behind the fetch
#[derive(Debug, Clone)]
struct Fetched {
    location: String,
    content: String,
}

type Slot = Arc<tokio::sync::Mutex<Option<Fetched>>>;

/// Single-flight content resolution on top of a [`ContentLoader`]
///
/// Concurrent requests for the same path wait on one another, so at most one
/// fetch per path is ever in flight. Callers queued behind a fetch reuse its
/// content even when the first caller was not allowed to store it.
pub struct ContentResolver {
    loader: Arc<dyn ContentLoader>,
    timeout: Duration,
    in_flight: Mutex<HashMap<String, Slot>>,
}

impl ContentResolver {
    pub fn new(loader: Arc<dyn ContentLoader>, timeout: Duration) -> Self {
        Self {
            loader,
            timeout,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Return the content of `path`, fetching it if necessary.
    ///
    /// `Ok(None)` means there is nothing to load: the path is unknown, or the
    /// file has neither content nor a remote location. Fetched content is
    /// written back only when `mode` permits it for the file's current state;
    /// otherwise it is returned without being stored.
    pub async fn resolve(
        &self,
        registry: &FileRegistry,
        path: &str,
        mode: LoadMode,
    ) -> Result<Option<String>, ResolveError> {
        let slot = self.slot(path);
        let resolved = {
            let mut fetched = slot.lock().await;
            self.resolve_locked(registry, path, mode, &mut fetched).await
        };
        self.release(path, &slot);
        resolved
    }

    async fn resolve_locked(
        &self,
        registry: &FileRegistry,
        path: &str,
        mode: LoadMode,
        fetched: &mut Option<Fetched>,
    ) -> Result<Option<String>, ResolveError> {
        let Some(file) = registry.get(path)? else {
            return Ok(None);
        };
        if let Some(content) = file.content {
            return Ok(Some(content));
        }
        let Some(location) = file.remote_location else {
            return Ok(None);
        };

        let reusable = fetched
            .as_ref()
            .filter(|previous| previous.location == location)
            .map(|previous| previous.content.clone());

        let content = match reusable {
            Some(content) => {
                debug!(path = %path, "Reusing content fetched by an earlier request");
                content
            },
            None => {
                let content = tokio::time::timeout(self.timeout, self.loader.fetch(&location))
                    .await
                    .map_err(|_| FetchError::Timeout {
                        location: location.clone(),
                        after: self.timeout,
                    })??;
                *fetched = Some(Fetched {
                    location: location.clone(),
                    content: content.clone(),
                });
                content
            },
        };

        let stored = registry.upsert(path, |file| {
            let same_source = file.remote_location.as_deref() == Some(location.as_str());
            if same_source && !file.has_content() && mode.may_store(file.status()) {
                file.set_content(content.clone());
                true
            } else {
                false
            }
        })?;

        match stored {
            Some(true) => info!(path = %path, bytes = content.len(), "Loaded file content"),
            _ => debug!(path = %path, ?mode, "Fetched content not stored for current file state"),
        }

        Ok(Some(content))
    }

    fn slot(&self, path: &str) -> Slot {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(path.to_string()).or_default())
    }

    fn release(&self, path: &str, slot: &Slot) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Map plus our handle: nobody else is waiting on this path.
        if Arc::strong_count(slot) == 2 {
            in_flight.remove(path);
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
