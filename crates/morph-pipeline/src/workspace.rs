//! Workspace: the command surface tying discovery, registry, loading, and
//! the batch pipeline together.
//!
//! Every import replaces the whole file set and makes the first file (in
//! path order) the active one. A failed import leaves the previous file set
//! and active file untouched.

use morph_common::types::{sample_workspace_file, FileDescriptor, MigrationConfig};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::discovery::{
    discover_archive, discover_upload, download_archive, GitHubProvider, RepositoryProvider,
};
use crate::error::WorkspaceError;
use crate::loader::{ContentLoader, ContentResolver, HttpContentLoader, LoadMode, ResolveError};
use crate::pipeline::{BatchConfig, BatchSummary, MigrationPipeline};
use crate::registry::FileRegistry;
use crate::transform::TransformationClient;

pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Workspace {
    registry: Arc<FileRegistry>,
    resolver: Arc<ContentResolver>,
    pipeline: MigrationPipeline,
    repositories: Arc<dyn RepositoryProvider>,
    active: RwLock<Option<String>>,
}

impl Workspace {
    pub fn builder() -> WorkspaceBuilder {
        WorkspaceBuilder::default()
    }

    /// Replace the file set with the contents of a zip archive
    #[instrument(skip_all, fields(bytes = bytes.len()))]
    pub fn import_archive(&self, bytes: &[u8]) -> Result<usize, WorkspaceError> {
        let files = discover_archive(bytes)?;
        self.install(files)
    }

    /// Replace the file set with a zip archive downloaded from `url`
    #[instrument(skip(self))]
    pub async fn import_archive_url(&self, url: &str) -> Result<usize, WorkspaceError> {
        let bytes = download_archive(url, DEFAULT_DISCOVERY_TIMEOUT).await?;
        self.import_archive(&bytes)
    }

    /// Replace the file set with a single uploaded file
    #[instrument(skip(self, bytes))]
    pub fn import_upload(&self, file_name: &str, bytes: &[u8]) -> Result<usize, WorkspaceError> {
        self.install(discover_upload(file_name, bytes))
    }

    /// Replace the file set with the files of a remote repository.
    ///
    /// Only the first file's content is loaded eagerly; a failure to load it
    /// is logged and does not fail the import.
    #[instrument(skip(self))]
    pub async fn import_repository(&self, url: &str) -> Result<usize, WorkspaceError> {
        let files = self.repositories.discover(url).await?;
        let installed = self.install(files)?;

        if let Some(first) = self.active_path() {
            self.select_file(&first).await?;
        }
        Ok(installed)
    }

    /// Make `path` the active file, loading its content if needed.
    ///
    /// The returned descriptor carries the content that was loaded even when
    /// the file's state did not allow storing it. Fetch failures are logged
    /// and leave the content empty.
    pub async fn select_file(&self, path: &str) -> Result<FileDescriptor, WorkspaceError> {
        let Some(mut file) = self.registry.get(path)? else {
            return Err(WorkspaceError::UnknownFile(path.to_string()));
        };
        self.set_active(Some(path.to_string()));

        if file.has_content() || file.remote_location.is_none() {
            return Ok(file);
        }

        match self
            .resolver
            .resolve(&self.registry, path, LoadMode::Selection)
            .await
        {
            Ok(content) => {
                if let Some(latest) = self.registry.get(path)? {
                    file = latest;
                }
                if !file.has_content() {
                    file.content = content;
                }
            },
            Err(ResolveError::Fetch(e)) => {
                warn!(path = %path, error = %e, "Failed to load file content");
            },
            Err(ResolveError::Registry(e)) => return Err(e.into()),
        }

        Ok(file)
    }

    pub fn active_path(&self) -> Option<String> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn active_file(&self) -> Result<Option<FileDescriptor>, WorkspaceError> {
        match self.active_path() {
            Some(path) => Ok(self.registry.get(&path)?),
            None => Ok(None),
        }
    }

    pub fn snapshot(&self) -> Result<Vec<FileDescriptor>, WorkspaceError> {
        Ok(self.registry.snapshot()?)
    }

    pub fn registry(&self) -> &Arc<FileRegistry> {
        &self.registry
    }

    pub fn pipeline(&self) -> &MigrationPipeline {
        &self.pipeline
    }

    pub fn is_batch_running(&self) -> bool {
        self.pipeline.is_running()
    }

    /// Migrate every pending or failed file
    pub async fn run_batch(&self, config: &MigrationConfig) -> Result<BatchSummary, WorkspaceError> {
        Ok(self.pipeline.run(config).await?)
    }

    pub async fn run_batch_until_cancelled(
        &self,
        config: &MigrationConfig,
        cancel: CancellationToken,
    ) -> Result<BatchSummary, WorkspaceError> {
        Ok(self.pipeline.run_until_cancelled(config, cancel).await?)
    }

    fn install(&self, files: Vec<FileDescriptor>) -> Result<usize, WorkspaceError> {
        if self.pipeline.is_running() {
            warn!("Replacing files while a batch run is active; its remaining results will be discarded");
        }

        let installed = self.registry.replace_all(files)?;
        let first = self.registry.paths()?.into_iter().next();
        info!(files = installed, active = ?first, "Workspace files replaced");
        self.set_active(first);
        Ok(installed)
    }

    fn set_active(&self, path: Option<String>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = path;
    }
}

/// Assembles a [`Workspace`]; only the transformation client is required
#[derive(Default)]
pub struct WorkspaceBuilder {
    client: Option<Arc<dyn TransformationClient>>,
    loader: Option<Arc<dyn ContentLoader>>,
    repositories: Option<Arc<dyn RepositoryProvider>>,
    batch: BatchConfig,
    with_sample: bool,
}

impl WorkspaceBuilder {
    pub fn transformation_client(mut self, client: Arc<dyn TransformationClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn content_loader(mut self, loader: Arc<dyn ContentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn repository_provider(mut self, provider: Arc<dyn RepositoryProvider>) -> Self {
        self.repositories = Some(provider);
        self
    }

    pub fn batch_config(mut self, config: BatchConfig) -> Self {
        self.batch = config;
        self
    }

    /// Start with the built-in legacy sample as the only, active file
    pub fn with_sample(mut self) -> Self {
        self.with_sample = true;
        self
    }

    pub fn build(self) -> Result<Workspace, WorkspaceError> {
        let client = self
            .client
            .ok_or_else(|| WorkspaceError::Setup("a transformation client is required".to_string()))?;

        let loader: Arc<dyn ContentLoader> = match self.loader {
            Some(loader) => loader,
            None => Arc::new(
                HttpContentLoader::new(self.batch.fetch_timeout)
                    .map_err(|e| WorkspaceError::Setup(e.to_string()))?,
            ),
        };

        let repositories: Arc<dyn RepositoryProvider> = match self.repositories {
            Some(provider) => provider,
            None => Arc::new(GitHubProvider::new(DEFAULT_DISCOVERY_TIMEOUT)?),
        };

        let registry = Arc::new(FileRegistry::new());
        let resolver = Arc::new(ContentResolver::new(loader, self.batch.fetch_timeout));
        let pipeline = MigrationPipeline::new(
            Arc::clone(&registry),
            Arc::clone(&resolver),
            client,
            self.batch,
        );

        let workspace = Workspace {
            registry,
            resolver,
            pipeline,
            repositories,
            active: RwLock::new(None),
        };

        if self.with_sample {
            workspace.install(vec![sample_workspace_file()])?;
        }

        Ok(workspace)
    }
}
