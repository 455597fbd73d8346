//! GitHub repository discovery
//!
//! Lists a repository's tree through the REST API and registers each blob
//! by its raw download URL. Nothing is downloaded here; content is resolved
//! lazily by the loader.

use async_trait::async_trait;
use morph_common::types::FileDescriptor;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::RepositoryProvider;
use crate::error::DiscoveryError;

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITHUB_RAW_URL: &str = "https://raw.githubusercontent.com";

/// Branch assumed when the repository metadata cannot be read
pub const FALLBACK_BRANCH: &str = "main";

static REPO_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"github\.com/([^/\s]+)/([^/\s?#]+)").ok());

/// Owner and name of a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Extract owner and repository from a GitHub URL, dropping a `.git` suffix
    pub fn parse(url: &str) -> Result<Self, DiscoveryError> {
        let invalid = || DiscoveryError::InvalidUrl(url.to_string());

        let captures = REPO_PATTERN
            .as_ref()
            .and_then(|pattern| pattern.captures(url))
            .ok_or_else(invalid)?;

        let owner = captures[1].to_string();
        let repo = captures[2].trim_end_matches(".git").to_string();
        if repo.is_empty() {
            return Err(invalid());
        }

        Ok(Self { owner, repo })
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// [`RepositoryProvider`] for GitHub
pub struct GitHubProvider {
    client: Client,
    api_base: Url,
    raw_base: Url,
    token: Option<String>,
}

impl GitHubProvider {
    pub fn new(timeout: Duration) -> Result<Self, DiscoveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("codemorph/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: parse_base(GITHUB_API_URL)?,
            raw_base: parse_base(GITHUB_RAW_URL)?,
            token: None,
        })
    }

    pub fn with_api_base(mut self, base: &str) -> Result<Self, DiscoveryError> {
        self.api_base = parse_base(base)?;
        Ok(self)
    }

    pub fn with_raw_base(mut self, base: &str) -> Result<Self, DiscoveryError> {
        self.raw_base = parse_base(base)?;
        Ok(self)
    }

    /// Authenticate API calls, raising the rate limit
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Default branch of `repo`, or [`FALLBACK_BRANCH`] when it cannot be read
    pub async fn default_branch(&self, repo: &RepoRef) -> String {
        let url = self.api_url(&["repos", &repo.owner, &repo.repo]);

        let branch = match self.get(url).send().await {
            Ok(response) if response.status().is_success() => response
                .json::<RepoMetadata>()
                .await
                .ok()
                .and_then(|meta| meta.default_branch),
            Ok(response) => {
                debug!(status = %response.status(), "Repository metadata unavailable");
                None
            },
            Err(e) => {
                debug!(error = %e, "Repository metadata request failed");
                None
            },
        };

        branch.unwrap_or_else(|| {
            warn!(repo = %repo, "Could not determine default branch; assuming '{}'", FALLBACK_BRANCH);
            FALLBACK_BRANCH.to_string()
        })
    }

    /// Paths of every blob in the recursive tree of `branch`
    pub async fn list_blobs(&self, repo: &RepoRef, branch: &str) -> Result<Vec<String>, DiscoveryError> {
        let mut url = self.api_url(&["repos", &repo.owner, &repo.repo, "git", "trees", branch]);
        url.query_pairs_mut().append_pair("recursive", "1");

        let response = self.get(url).send().await?;
        match response.status() {
            status if status.is_success() => {},
            StatusCode::FORBIDDEN => return Err(DiscoveryError::RateLimited),
            StatusCode::NOT_FOUND => return Err(DiscoveryError::NotFound(repo.to_string())),
            status => return Err(DiscoveryError::Api(status.to_string())),
        }

        let tree: TreeResponse = response.json().await?;
        if tree.truncated {
            warn!(repo = %repo, "Repository tree was truncated by the API; some files are missing");
        }

        Ok(tree
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob")
            .map(|entry| entry.path)
            .collect())
    }

    /// Raw download URL of `path` at `branch`
    pub fn raw_url(&self, repo: &RepoRef, branch: &str, path: &str) -> String {
        let mut url = self.raw_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&repo.owner)
                .push(&repo.repo)
                .extend(branch.split('/'))
                .extend(path.split('/'));
        }
        url.to_string()
    }

    fn api_url(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RepositoryProvider for GitHubProvider {
    #[instrument(skip(self))]
    async fn discover(&self, url: &str) -> Result<Vec<FileDescriptor>, DiscoveryError> {
        let repo = RepoRef::parse(url)?;
        let branch = self.default_branch(&repo).await;

        let mut paths = self.list_blobs(&repo, &branch).await?;
        paths.sort();

        let files: Vec<FileDescriptor> = paths
            .into_iter()
            .map(|path| {
                let location = self.raw_url(&repo, &branch, &path);
                FileDescriptor::remote(path, location)
            })
            .collect();

        info!(repo = %repo, branch = %branch, files = files.len(), "Discovered repository files");
        Ok(files)
    }
}

fn parse_base(base: &str) -> Result<Url, DiscoveryError> {
    let url = Url::parse(base).map_err(|_| DiscoveryError::InvalidUrl(base.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(DiscoveryError::InvalidUrl(base.to_string()));
    }
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct RepoMetadata {
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}
