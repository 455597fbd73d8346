//! File discovery
//!
//! Turns an external source into an ordered list of pending descriptors.
//! Three kinds of source are supported:
//!
//! - [`archive`]: a zip archive, local or downloaded, fully read into memory
//! - [`upload`]: a single uploaded file
//! - [`github`]: a public GitHub repository, listed by path with content
//!   left for lazy loading

pub mod archive;
pub mod github;
pub mod upload;

pub use archive::{discover_archive, download_archive};
pub use github::{GitHubProvider, RepoRef, GITHUB_API_URL, GITHUB_RAW_URL};
pub use upload::discover_upload;

use async_trait::async_trait;
use morph_common::types::FileDescriptor;
use url::Url;

use crate::error::DiscoveryError;

/// Lists the files of a remote repository
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    /// Descriptors for every regular file, sorted by path, content unloaded
    async fn discover(&self, url: &str) -> Result<Vec<FileDescriptor>, DiscoveryError>;
}

/// What kind of source a command-line argument names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Repository,
    /// A `.zip` served over HTTP
    RemoteArchive,
    Archive,
    File,
}

impl SourceKind {
    /// URLs whose path ends in `.zip` are archives; any other URL names a
    /// repository. Everything else is a local path.
    pub fn detect(source: &str) -> Self {
        let lower = source.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let zip_path = Url::parse(&lower)
                .map(|url| url.path().ends_with(".zip"))
                .unwrap_or(false);
            if zip_path {
                SourceKind::RemoteArchive
            } else {
                SourceKind::Repository
            }
        } else if lower.contains("github.com/") {
            SourceKind::Repository
        } else if lower.ends_with(".zip") {
            SourceKind::Archive
        } else {
            SourceKind::File
        }
    }
}
