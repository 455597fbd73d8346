//! Runtime configuration for the `morph` binary
//!
//! Values resolve in three layers: built-in defaults, then `MORPH_*`
//! environment variables (a `.env` file is loaded first), then command-line
//! flags.

use crate::error::{CliError, Result};
use crate::GlobalArgs;
use morph_pipeline::discovery::{GitHubProvider, GITHUB_API_URL, GITHUB_RAW_URL};
use morph_pipeline::loader::DEFAULT_FETCH_TIMEOUT;
use morph_pipeline::transform::{GeminiClient, DEFAULT_MODEL, DEFAULT_TRANSFORM_TIMEOUT, GEMINI_API_URL};
use morph_pipeline::workspace::DEFAULT_DISCOVERY_TIMEOUT;
use morph_pipeline::{BatchConfig, Workspace};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key; only `migrate` needs one
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_url: String,
    pub github_api_url: String,
    pub github_raw_url: String,
    pub github_token: Option<String>,
    /// Per-file transformation timeout
    pub transform_timeout: Duration,
    /// Per-file content fetch timeout
    pub fetch_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_url: GEMINI_API_URL.to_string(),
            github_api_url: GITHUB_API_URL.to_string(),
            github_raw_url: GITHUB_RAW_URL.to_string(),
            github_token: None,
            transform_timeout: DEFAULT_TRANSFORM_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, starting from defaults
    ///
    /// Environment variables:
    /// - `MORPH_GEMINI_MODEL`: model id used for transformations
    /// - `MORPH_GEMINI_URL`: Gemini API base URL
    /// - `MORPH_GITHUB_API_URL`: GitHub REST API base URL
    /// - `MORPH_GITHUB_RAW_URL`: raw content base URL
    /// - `MORPH_TIMEOUT_SECS`: per-file transformation timeout
    /// - `MORPH_FETCH_TIMEOUT_SECS`: per-file content fetch timeout
    ///
    /// `GEMINI_API_KEY` and `GITHUB_TOKEN` arrive through the matching flags.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(model) = std::env::var("MORPH_GEMINI_MODEL") {
            config.gemini_model = model;
        }
        if let Ok(url) = std::env::var("MORPH_GEMINI_URL") {
            config.gemini_url = url;
        }
        if let Ok(url) = std::env::var("MORPH_GITHUB_API_URL") {
            config.github_api_url = url;
        }
        if let Ok(url) = std::env::var("MORPH_GITHUB_RAW_URL") {
            config.github_raw_url = url;
        }
        if let Ok(secs) = std::env::var("MORPH_TIMEOUT_SECS") {
            config.transform_timeout = parse_secs("MORPH_TIMEOUT_SECS", &secs)?;
        }
        if let Ok(secs) = std::env::var("MORPH_FETCH_TIMEOUT_SECS") {
            config.fetch_timeout = parse_secs("MORPH_FETCH_TIMEOUT_SECS", &secs)?;
        }

        Ok(config)
    }

    /// Apply command-line flags on top of the current values
    pub fn with_overrides(mut self, args: &GlobalArgs) -> Result<Self> {
        if let Some(ref key) = args.api_key {
            self.gemini_api_key = Some(key.clone()).filter(|k| !k.trim().is_empty());
        }
        if let Some(ref model) = args.model {
            self.gemini_model = model.clone();
        }
        if let Some(ref url) = args.gemini_url {
            self.gemini_url = url.clone();
        }
        if let Some(ref url) = args.github_api_url {
            self.github_api_url = url.clone();
        }
        if let Some(ref url) = args.github_raw_url {
            self.github_raw_url = url.clone();
        }
        if let Some(ref token) = args.github_token {
            self.github_token = Some(token.clone()).filter(|t| !t.trim().is_empty());
        }
        if let Some(secs) = args.timeout_secs {
            if secs == 0 {
                return Err(CliError::config("--timeout-secs must be at least 1"));
            }
            self.transform_timeout = Duration::from_secs(secs);
        }

        Ok(self)
    }

    /// API key, or an error telling the user how to provide one
    pub fn require_api_key(&self) -> Result<&str> {
        self.gemini_api_key.as_deref().ok_or(CliError::MissingApiKey)
    }

    /// Build the workspace every command operates on
    pub fn workspace(&self, batch: BatchConfig, with_sample: bool) -> Result<Workspace> {
        // Commands that never transform still need a client to assemble the
        // workspace; without a key, any call would be rejected by the service.
        let client = GeminiClient::with_timeout(
            self.gemini_api_key.clone().unwrap_or_default(),
            self.transform_timeout,
        )?
        .with_model(self.gemini_model.clone())
        .with_base_url(self.gemini_url.clone());

        let mut github = GitHubProvider::new(DEFAULT_DISCOVERY_TIMEOUT)?
            .with_api_base(&self.github_api_url)?
            .with_raw_base(&self.github_raw_url)?;
        if let Some(ref token) = self.github_token {
            github = github.with_token(token.clone());
        }

        let batch = batch
            .with_transform_timeout(self.transform_timeout)
            .with_fetch_timeout(self.fetch_timeout);

        let mut builder = Workspace::builder()
            .transformation_client(Arc::new(client))
            .repository_provider(Arc::new(github))
            .batch_config(batch);
        if with_sample {
            builder = builder.with_sample();
        }

        Ok(builder.build()?)
    }
}

fn parse_secs(name: &str, value: &str) -> Result<Duration> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(CliError::config(format!(
            "{} must be a positive number of seconds, got '{}'",
            name, value
        ))),
    }
}
