// Segment fetcher: downloads one remote resource to one local path, skipping
// anything already present. The existence check is what makes repeated fills
// and restarts cheap, so nothing here may ever leave a partial file at the
// final path.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use crate::error::{RelayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched,
    Skipped,
}

pub struct SegmentFetcher {
    client: Client,
}

impl SegmentFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch `remote_url` into `local_path` unless the file already exists.
    ///
    /// Failed downloads never create the destination file: the payload lands
    /// in a temporary sibling first and is renamed into place only once fully
    /// written.
    pub async fn fetch(&self, remote_url: &str, local_path: &Path) -> Result<FetchOutcome> {
        if tokio::fs::try_exists(local_path).await? {
            debug!(path = %local_path.display(), "already cached, skipping fetch");
            return Ok(FetchOutcome::Skipped);
        }

        let response = self.client.get(remote_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::http_status(status, remote_url, "segment fetch"));
        }
        let payload: Bytes = response.bytes().await?;

        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_atomic(local_path, &payload).await?;
        debug!(
            url = remote_url,
            bytes = payload.len(),
            path = %local_path.display(),
            "downloaded segment"
        );
        Ok(FetchOutcome::Fetched)
    }
}

/// Write via a temporary sibling and rename, so a concurrent reader never
/// observes a partially written file.
pub(crate) async fn write_atomic(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let tmp = temp_sibling(path);
    if let Err(err) = tokio::fs::write(&tmp, payload).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err);
    }
    match tokio::fs::rename(&tmp, path).await {
        Ok(()) => Ok(()),
        Err(err) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            Err(err)
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    name.push(".part");
    path.with_file_name(name)
}
