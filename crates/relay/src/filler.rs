// Cache filler: walks every profile of an allocated stream and mirrors its
// playlist plus referenced segments into the local cache. Best-effort
// throughout: a failing profile or segment is logged and skipped, never fatal.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use reqwest::Client;
use tracing::{error, info, warn};

use origin_client::StreamDescriptor;

use crate::error::{RelayError, Result};
use crate::fetcher::{FetchOutcome, SegmentFetcher, write_atomic};
use crate::playlist::rewrite_playlist;

/// Profile name to local playlist URL. Ordered, so serialized output is
/// identical regardless of fill execution order.
pub type LocalUrlMap = BTreeMap<String, String>;

/// Name of the rewritten playlist inside each profile's cache directory.
pub const LOCAL_PLAYLIST_NAME: &str = "index.m3u8";

pub struct CacheFiller {
    client: Client,
    fetcher: SegmentFetcher,
}

impl CacheFiller {
    pub fn new(client: Client) -> Self {
        let fetcher = SegmentFetcher::new(client.clone());
        Self { client, fetcher }
    }

    /// Mirror every profile of `descriptor` under `cache_root` and return the
    /// map of local playlist URLs. With `enabled` false the fill is a no-op.
    pub async fn fill(
        &self,
        descriptor: &StreamDescriptor,
        cache_root: &Path,
        local_base_url: &str,
        enabled: bool,
    ) -> LocalUrlMap {
        let mut local_urls = LocalUrlMap::new();
        if !enabled {
            info!("caching disabled, nothing to fill");
            return local_urls;
        }

        if let Err(err) = tokio::fs::create_dir_all(cache_root).await {
            error!(
                cache_root = %cache_root.display(),
                %err,
                "failed to create cache root, aborting fill"
            );
            return local_urls;
        }

        for profile in &descriptor.profiles {
            let Some(remote_url) = profile.remote_url.as_deref().filter(|u| !u.is_empty()) else {
                continue;
            };
            match self
                .fill_profile(&profile.name, remote_url, cache_root, local_base_url)
                .await
            {
                Ok(local_url) => {
                    local_urls.insert(profile.name.clone(), local_url);
                }
                Err(err) => {
                    warn!(profile = %profile.name, %err, "skipping profile");
                }
            }
        }

        local_urls
    }

    async fn fill_profile(
        &self,
        profile_name: &str,
        remote_url: &str,
        cache_root: &Path,
        local_base_url: &str,
    ) -> Result<String> {
        info!(profile = profile_name, url = remote_url, "fetching playlist");
        let playlist_text = self.fetch_playlist(remote_url).await?;
        let rewritten = rewrite_playlist(&playlist_text, remote_url, local_base_url, profile_name);

        let profile_dir = cache_root.join(profile_name);
        tokio::fs::create_dir_all(&profile_dir).await?;
        write_atomic(
            &profile_dir.join(LOCAL_PLAYLIST_NAME),
            rewritten.content.as_bytes(),
        )
        .await?;

        for reference in &rewritten.references {
            let Some(destination) = segment_destination(&profile_dir, &reference.relative_path)
            else {
                warn!(
                    profile = profile_name,
                    path = %reference.relative_path,
                    "reference escapes the cache root, skipping"
                );
                continue;
            };
            match self.fetcher.fetch(&reference.remote_url, &destination).await {
                Ok(FetchOutcome::Fetched | FetchOutcome::Skipped) => {}
                Err(err) => {
                    warn!(
                        profile = profile_name,
                        url = %reference.remote_url,
                        %err,
                        "skipping segment"
                    );
                }
            }
        }

        Ok(format!("{local_base_url}{profile_name}/{LOCAL_PLAYLIST_NAME}"))
    }

    async fn fetch_playlist(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::http_status(status, url, "playlist fetch"));
        }
        Ok(response.text().await?)
    }
}

/// Resolve a playlist-relative segment path inside the profile directory.
/// Paths with parent or absolute components would land outside the cache and
/// are rejected.
fn segment_destination(profile_dir: &Path, relative: &str) -> Option<PathBuf> {
    let mut destination = profile_dir.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => destination.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(destination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_preserves_subdirectories() {
        let dest = segment_destination(Path::new("/cache/480p"), "sub/seg1.ts").unwrap();
        assert_eq!(dest, Path::new("/cache/480p/sub/seg1.ts"));
    }

    #[test]
    fn destination_rejects_escaping_paths() {
        assert!(segment_destination(Path::new("/cache/480p"), "../../etc/passwd").is_none());
        assert!(segment_destination(Path::new("/cache/480p"), "/etc/passwd").is_none());
    }
}
