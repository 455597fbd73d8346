//! Scripted collaborators shared by the pipeline integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use morph_common::types::{
    FileDescriptor, MigrationConfig, SecurityIssue, Severity, TransformResult,
};
use morph_pipeline::error::{FetchError, TransformError};
use morph_pipeline::loader::{ContentLoader, ContentResolver, DEFAULT_FETCH_TIMEOUT};
use morph_pipeline::transform::{validate_source, TransformationClient};
use morph_pipeline::{BatchConfig, FileRegistry, MigrationPipeline};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(String),
    End(String),
}

/// Transformation client that records call order and observed concurrency
#[derive(Default)]
pub struct ScriptedClient {
    calls: Mutex<Vec<Call>>,
    failing: HashSet<String>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Paths in the order the client was invoked
    pub fn started(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Start(path) => Some(path),
                Call::End(_) => None,
            })
            .collect()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransformationClient for ScriptedClient {
    async fn transform(
        &self,
        source_code: &str,
        _config: &MigrationConfig,
        file_name: &str,
    ) -> Result<TransformResult, TransformError> {
        validate_source(source_code)?;

        self.calls.lock().unwrap().push(Call::Start(file_name.to_string()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(Call::End(file_name.to_string()));

        if self.failing.contains(file_name) {
            return Err(TransformError::Service {
                status: 503,
                message: format!("model overloaded while migrating {}", file_name),
            });
        }
        Ok(fixed_result(file_name))
    }
}

/// Content loader serving canned responses keyed by location
#[derive(Default)]
pub struct MapLoader {
    responses: HashMap<String, Result<String, u16>>,
    fetches: AtomicUsize,
}

impl MapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serving(mut self, location: &str, body: &str) -> Self {
        self.responses
            .insert(location.to_string(), Ok(body.to_string()));
        self
    }

    pub fn failing(mut self, location: &str, status: u16) -> Self {
        self.responses.insert(location.to_string(), Err(status));
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentLoader for MapLoader {
    async fn fetch(&self, location: &str) -> Result<String, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(location) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::Status {
                location: location.to_string(),
                status: *status,
            }),
            None => Err(FetchError::Status {
                location: location.to_string(),
                status: 404,
            }),
        }
    }
}

pub fn fixed_result(file_name: &str) -> TransformResult {
    TransformResult {
        modern_code: format!("// modernized {}", file_name),
        unit_tests: format!("// tests for {}", file_name),
        documentation: format!("# {}\n\nUpgraded to the target stack.", file_name),
        security_report: vec![SecurityIssue {
            severity: Severity::Medium,
            description: "Plain-text credentials".to_string(),
            remediation: "Use a password encoder".to_string(),
        }],
    }
}

pub struct Harness {
    pub registry: Arc<FileRegistry>,
    pub client: Arc<ScriptedClient>,
    pub loader: Arc<MapLoader>,
    pub pipeline: MigrationPipeline,
}

impl Harness {
    pub fn new(files: Vec<FileDescriptor>, client: ScriptedClient, loader: MapLoader) -> Self {
        Self::with_config(files, client, loader, BatchConfig::default())
    }

    pub fn with_config(
        files: Vec<FileDescriptor>,
        client: ScriptedClient,
        loader: MapLoader,
        config: BatchConfig,
    ) -> Self {
        let registry = Arc::new(FileRegistry::new());
        registry.replace_all(files).unwrap();

        let client = Arc::new(client);
        let loader = Arc::new(loader);
        let resolver = Arc::new(ContentResolver::new(loader.clone(), DEFAULT_FETCH_TIMEOUT));
        let pipeline = MigrationPipeline::new(registry.clone(), resolver, client.clone(), config);

        Self {
            registry,
            client,
            loader,
            pipeline,
        }
    }

    pub fn file(&self, path: &str) -> FileDescriptor {
        self.registry.get(path).unwrap().unwrap()
    }
}
