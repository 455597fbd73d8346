use morph_common::types::FileDescriptor;
use reqwest::Client;
use std::io::{Cursor, Read};
use std::time::Duration;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::DiscoveryError;

const RESOURCE_FORK_DIR: &str = "__MACOSX";

/// Read every regular file of a zip archive into pending descriptors.
///
/// Directories, hidden paths (any segment starting with `.`) and macOS
/// resource-fork entries are skipped. Content is decoded as UTF-8 with
/// invalid sequences replaced. The result is sorted by path.
pub fn discover_archive(bytes: &[u8]) -> Result<Vec<FileDescriptor>, DiscoveryError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut files = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let path = entry.name().to_string();
        if is_ignored(&path) {
            debug!(path = %path, "Skipping archive entry");
            continue;
        }

        let mut buffer = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buffer)
            .map_err(|source| DiscoveryError::ArchiveEntry {
                path: path.clone(),
                source,
            })?;

        files.push(FileDescriptor::with_content(
            path,
            String::from_utf8_lossy(&buffer).into_owned(),
        ));
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    info!(files = files.len(), "Discovered files in archive");
    Ok(files)
}

/// Download the raw bytes of a zip archive served over HTTP
pub async fn download_archive(url: &str, timeout: Duration) -> Result<Vec<u8>, DiscoveryError> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("codemorph/", env!("CARGO_PKG_VERSION")))
        .build()?;

    debug!(url = %url, "Downloading archive");
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(DiscoveryError::Download {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await?;
    info!(url = %url, bytes = bytes.len(), "Downloaded archive");
    Ok(bytes.to_vec())
}

fn is_ignored(path: &str) -> bool {
    path.split('/')
        .any(|segment| segment.starts_with('.') || segment == RESOURCE_FORK_DIR)
}
