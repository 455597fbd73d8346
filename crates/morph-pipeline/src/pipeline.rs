//! Batch migration pipeline
//!
//! A run takes a snapshot of every eligible file (pending or failed) and
//! drives each through `Processing` into `Completed` or `Failed`:
//!
//! 1. Mark the file `Processing`
//! 2. Resolve its content, fetching it if needed
//! 3. Call the transformation client
//! 4. Record the result, or a diagnostic on failure
//!
//! A failing file never stops the run. Only registry corruption aborts it.
//! At most one run is active per pipeline; the running flag is cleared on
//! every exit path, panics and cancelled futures included. A file whose step
//! is interrupted that way is marked `Failed` with [`INTERRUPTED_ERROR`], so
//! the next run picks it up again.

use futures::{stream, StreamExt, TryStreamExt};
use morph_common::types::{MigrationConfig, MigrationState, TransformResult};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{FetchError, PipelineError, RegistryError, TransformError};
use crate::loader::{ContentResolver, LoadMode, ResolveError, DEFAULT_FETCH_TIMEOUT};
use crate::registry::FileRegistry;
use crate::transform::{TransformationClient, DEFAULT_TRANSFORM_TIMEOUT};

/// Diagnostic left on a file whose run was dropped mid-step
pub const INTERRUPTED_ERROR: &str = "batch interrupted";

/// How eligible files are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// One file at a time, in path order
    #[default]
    Sequential,
    /// Up to `max_in_flight` files at once, started in path order
    Bounded { max_in_flight: usize },
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub strategy: ExecutionStrategy,
    pub fetch_timeout: Duration,
    pub transform_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            strategy: ExecutionStrategy::Sequential,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            transform_timeout: DEFAULT_TRANSFORM_TIMEOUT,
        }
    }
}

impl BatchConfig {
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sequential for `concurrency <= 1`, bounded otherwise
    pub fn with_concurrency(self, concurrency: usize) -> Self {
        let strategy = if concurrency <= 1 {
            ExecutionStrategy::Sequential
        } else {
            ExecutionStrategy::Bounded {
                max_in_flight: concurrency,
            }
        };
        self.with_strategy(strategy)
    }

    pub fn with_transform_timeout(mut self, timeout: Duration) -> Self {
        self.transform_timeout = timeout;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    /// Files that entered `Processing`
    pub attempted: usize,
    pub completed: usize,
    pub failed: usize,
    /// Eligible files left untouched because the run was cancelled
    pub cancelled: usize,
    /// Eligible files that changed or disappeared before their turn
    pub skipped: usize,
}

impl BatchSummary {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            attempted: 0,
            completed: 0,
            failed: 0,
            cancelled: 0,
            skipped: 0,
        }
    }

    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Completed => {
                self.attempted += 1;
                self.completed += 1;
            },
            FileOutcome::Failed => {
                self.attempted += 1;
                self.failed += 1;
            },
            FileOutcome::Abandoned => self.attempted += 1,
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Cancelled => self.cancelled += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Completed,
    Failed,
    /// Processed, but the registry entry was replaced before the outcome landed
    Abandoned,
    Skipped,
    Cancelled,
}

/// Why one file's step failed; rendered into the file's diagnostic
#[derive(Debug)]
enum StepFailure {
    Fetch(FetchError),
    EmptyContent,
    Transform(TransformError),
    TransformTimeout(Duration),
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepFailure::Fetch(e) => write!(f, "content fetch failed: {}", e),
            StepFailure::EmptyContent => f.write_str("empty content"),
            StepFailure::Transform(e) => write!(f, "{}", e),
            StepFailure::TransformTimeout(after) => {
                write!(f, "transformation timed out after {}s", after.as_secs())
            },
        }
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, PipelineError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PipelineError::AlreadyRunning)?;
        Ok(Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Fails a file still in `Processing` if its step never reaches an outcome
struct InterruptGuard<'a> {
    registry: &'a FileRegistry,
    path: &'a str,
    armed: bool,
}

impl<'a> InterruptGuard<'a> {
    fn arm(registry: &'a FileRegistry, path: &'a str) -> Self {
        Self {
            registry,
            path,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Rejected when the entry was replaced meanwhile, which is fine.
        match self.registry.upsert(self.path, |file| file.fail(INTERRUPTED_ERROR)) {
            Ok(Some(Ok(()))) => warn!(path = %self.path, "Batch interrupted mid-file; marked failed"),
            Ok(_) => {},
            Err(e) => warn!(path = %self.path, error = %e, "Could not mark interrupted file as failed"),
        }
    }
}

/// Drives eligible files through the transformation client
pub struct MigrationPipeline {
    registry: Arc<FileRegistry>,
    resolver: Arc<ContentResolver>,
    client: Arc<dyn TransformationClient>,
    config: BatchConfig,
    running: AtomicBool,
}

impl MigrationPipeline {
    pub fn new(
        registry: Arc<FileRegistry>,
        resolver: Arc<ContentResolver>,
        client: Arc<dyn TransformationClient>,
        config: BatchConfig,
    ) -> Self {
        Self {
            registry,
            resolver,
            client,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run every eligible file to a terminal state
    pub async fn run(&self, config: &MigrationConfig) -> Result<BatchSummary, PipelineError> {
        self.run_until_cancelled(config, CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), but stops starting new files once `cancel`
    /// fires. Files already in flight finish their step.
    pub async fn run_until_cancelled(
        &self,
        config: &MigrationConfig,
        cancel: CancellationToken,
    ) -> Result<BatchSummary, PipelineError> {
        let _running = RunningGuard::acquire(&self.running)?;
        let run_id = Uuid::new_v4();

        async {
            let eligible = self.registry.eligible_paths()?;
            info!(
                files = eligible.len(),
                strategy = ?self.config.strategy,
                "Starting batch run"
            );

            let mut summary = BatchSummary::new(run_id);

            match self.config.strategy {
                ExecutionStrategy::Sequential => {
                    for path in &eligible {
                        let outcome = if cancel.is_cancelled() {
                            FileOutcome::Cancelled
                        } else {
                            self.process_file(path, config).await?
                        };
                        summary.record(outcome);
                    }
                },
                ExecutionStrategy::Bounded { max_in_flight } => {
                    let outcomes: Vec<FileOutcome> = stream::iter(&eligible)
                        .map(|path| {
                            let cancel = &cancel;
                            async move {
                                if cancel.is_cancelled() {
                                    Ok(FileOutcome::Cancelled)
                                } else {
                                    self.process_file(path, config).await
                                }
                            }
                        })
                        .buffer_unordered(max_in_flight.max(1))
                        .try_collect()
                        .await?;

                    for outcome in outcomes {
                        summary.record(outcome);
                    }
                },
            }

            info!(
                attempted = summary.attempted,
                completed = summary.completed,
                failed = summary.failed,
                cancelled = summary.cancelled,
                "Batch run finished"
            );
            Ok::<_, PipelineError>(summary)
        }
        .instrument(info_span!("batch", run_id = %run_id))
        .await
    }

    async fn process_file(
        &self,
        path: &str,
        config: &MigrationConfig,
    ) -> Result<FileOutcome, PipelineError> {
        match self
            .registry
            .upsert(path, |file| file.transition(MigrationState::Processing))?
        {
            Some(Ok(())) => {},
            Some(Err(e)) => {
                debug!(path = %path, error = %e, "File no longer eligible; skipping");
                return Ok(FileOutcome::Skipped);
            },
            None => return Ok(FileOutcome::Skipped),
        }
        let guard = InterruptGuard::arm(&self.registry, path);

        let (next, outcome) = match self.execute_step(path, config).await? {
            Ok(result) => {
                info!(path = %path, findings = result.security_report.len(), "File migrated");
                (MigrationState::Completed(result), FileOutcome::Completed)
            },
            Err(failure) => {
                warn!(path = %path, error = %failure, "File migration failed");
                (
                    MigrationState::Failed {
                        error: failure.to_string(),
                    },
                    FileOutcome::Failed,
                )
            },
        };

        let recorded = self.registry.upsert(path, |file| file.transition(next))?;
        guard.disarm();

        match recorded {
            Some(Ok(())) => Ok(outcome),
            Some(Err(e)) => {
                warn!(path = %path, error = %e, "Discarding outcome for replaced file");
                Ok(FileOutcome::Abandoned)
            },
            None => {
                warn!(path = %path, "Discarding outcome for removed file");
                Ok(FileOutcome::Abandoned)
            },
        }
    }

    async fn execute_step(
        &self,
        path: &str,
        config: &MigrationConfig,
    ) -> Result<Result<TransformResult, StepFailure>, RegistryError> {
        let content = match self
            .resolver
            .resolve(&self.registry, path, LoadMode::Pipeline)
            .await
        {
            Ok(Some(content)) if !content.is_empty() => content,
            Ok(_) => return Ok(Err(StepFailure::EmptyContent)),
            Err(ResolveError::Fetch(e)) => return Ok(Err(StepFailure::Fetch(e))),
            Err(ResolveError::Registry(e)) => return Err(e),
        };

        let timeout = self.config.transform_timeout;
        let outcome = match tokio::time::timeout(
            timeout,
            self.client.transform(&content, config, path),
        )
        .await
        {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(StepFailure::Transform(e)),
            Err(_) => Err(StepFailure::TransformTimeout(timeout)),
        };
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::loader::ContentLoader;
    use async_trait::async_trait;
    use morph_common::types::{FileDescriptor, FileStatus};

    struct NoRemote;

    #[async_trait]
    impl ContentLoader for NoRemote {
        async fn fetch(&self, location: &str) -> Result<String, FetchError> {
            Err(FetchError::Status {
                location: location.to_string(),
                status: 404,
            })
        }
    }

    struct Echo;

    #[async_trait]
    impl TransformationClient for Echo {
        async fn transform(
            &self,
            source_code: &str,
            _config: &MigrationConfig,
            _file_name: &str,
        ) -> Result<TransformResult, TransformError> {
            crate::transform::validate_source(source_code)?;
            Ok(TransformResult {
                modern_code: source_code.to_uppercase(),
                unit_tests: String::new(),
                documentation: String::new(),
                security_report: Vec::new(),
            })
        }
    }

    fn pipeline(files: Vec<FileDescriptor>) -> MigrationPipeline {
        let registry = Arc::new(files.into_iter().collect::<FileRegistry>());
        let resolver = Arc::new(ContentResolver::new(Arc::new(NoRemote), DEFAULT_FETCH_TIMEOUT));
        MigrationPipeline::new(registry, resolver, Arc::new(Echo), BatchConfig::default())
    }

    #[test]
    fn test_step_failure_messages() {
        assert_eq!(StepFailure::EmptyContent.to_string(), "empty content");
        assert_eq!(
            StepFailure::Transform(TransformError::EmptySource).to_string(),
            "Source code cannot be empty"
        );
        let fetch = StepFailure::Fetch(FetchError::Status {
            location: "https://raw.example/a".to_string(),
            status: 404,
        });
        assert_eq!(
            fetch.to_string(),
            "content fetch failed: https://raw.example/a returned HTTP 404"
        );
        assert_eq!(
            StepFailure::TransformTimeout(Duration::from_secs(90)).to_string(),
            "transformation timed out after 90s"
        );
    }

    #[test]
    fn test_interrupt_guard_fails_processing_file() {
        let registry: FileRegistry = vec![
            FileDescriptor::with_content("a.java", "class A {}"),
            FileDescriptor::with_content("b.java", "class B {}"),
        ]
        .into_iter()
        .collect();
        for path in ["a.java", "b.java"] {
            registry
                .upsert(path, |file| file.transition(MigrationState::Processing))
                .unwrap();
        }

        drop(InterruptGuard::arm(&registry, "a.java"));
        InterruptGuard::arm(&registry, "b.java").disarm();

        let a = registry.get("a.java").unwrap().unwrap();
        assert_eq!(a.error_message(), Some(INTERRUPTED_ERROR));
        let b = registry.get("b.java").unwrap().unwrap();
        assert_eq!(b.status(), FileStatus::Processing);
    }

    #[test]
    fn test_with_concurrency_picks_strategy() {
        assert_eq!(
            BatchConfig::default().with_concurrency(1).strategy,
            ExecutionStrategy::Sequential
        );
        assert_eq!(
            BatchConfig::default().with_concurrency(4).strategy,
            ExecutionStrategy::Bounded { max_in_flight: 4 }
        );
    }

    #[test]
    fn test_running_guard_is_exclusive_and_released() {
        let flag = AtomicBool::new(false);
        {
            let _guard = RunningGuard::acquire(&flag).unwrap();
            assert!(flag.load(Ordering::Acquire));
            assert_eq!(
                RunningGuard::acquire(&flag).err(),
                Some(PipelineError::AlreadyRunning)
            );
        }
        assert!(!flag.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_run_mixes_outcomes() {
        let pipeline = pipeline(vec![
            FileDescriptor::with_content("a.java", "class A {}"),
            FileDescriptor::with_content("b.java", ""),
            FileDescriptor::remote("c.java", "https://raw.example/c.java"),
        ]);

        let summary = pipeline.run(&MigrationConfig::default()).await.unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 2);
        assert!(!pipeline.is_running());

        let registry = &pipeline.registry;
        let a = registry.get("a.java").unwrap().unwrap();
        assert_eq!(a.result().unwrap().modern_code, "CLASS A {}");
        let b = registry.get("b.java").unwrap().unwrap();
        assert_eq!(b.error_message(), Some("empty content"));
        let c = registry.get("c.java").unwrap().unwrap();
        assert_eq!(c.status(), FileStatus::Failed);
        assert!(c.error_message().unwrap().starts_with("content fetch failed"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_touches_nothing() {
        let pipeline = pipeline(vec![
            FileDescriptor::with_content("a.java", "class A {}"),
            FileDescriptor::with_content("b.java", "class B {}"),
        ]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = pipeline
            .run_until_cancelled(&MigrationConfig::default(), cancel)
            .await
            .unwrap();

        assert_eq!(summary.cancelled, 2);
        assert_eq!(summary.attempted, 0);
        assert_eq!(pipeline.registry.status_counts().unwrap().pending, 2);
    }
}
