use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::RelayError;

/// Cache-and-relay settings for one session. Immutable once constructed; the
/// orchestrator receives a value instead of reading process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Master switch for the local cache and content server.
    pub cache_enabled: bool,
    /// Directory the per-profile caches live under.
    pub cache_root: PathBuf,
    /// Prefix rewritten playlists point their references at.
    pub local_base_url: String,
    /// Content server bind address.
    pub bind_address: String,
    /// Content server port.
    pub server_port: u16,
    /// Blind delay between starting the encoder push and assuming the origin's
    /// playback endpoints are live. Not a readiness probe.
    pub warmup_delay_secs: u64,
    /// How long the content server keeps serving after ingestion completes.
    pub drain_window_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_root: PathBuf::from("./cache/stream"),
            local_base_url: "http://localhost:8080/cache/".to_string(),
            bind_address: "127.0.0.1".to_string(),
            server_port: 8080,
            warmup_delay_secs: 10,
            drain_window_secs: 1800,
        }
    }
}

impl RelayConfig {
    pub fn warmup_delay(&self) -> Duration {
        Duration::from_secs(self.warmup_delay_secs)
    }

    pub fn drain_window(&self) -> Duration {
        Duration::from_secs(self.drain_window_secs)
    }

    /// Local base URL with a guaranteed trailing slash, so profile names can
    /// be appended directly.
    pub fn normalized_local_base_url(&self) -> String {
        if self.local_base_url.ends_with('/') {
            self.local_base_url.clone()
        } else {
            format!("{}/", self.local_base_url)
        }
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        Url::parse(&self.local_base_url).map_err(|e| {
            RelayError::configuration(format!(
                "invalid local base URL `{}`: {e}",
                self.local_base_url
            ))
        })?;
        if self.bind_address.trim().is_empty() {
            return Err(RelayError::configuration("bind address must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = RelayConfig::default();
        assert!(config.cache_enabled);
        assert_eq!(config.server_port, 8080);
        assert!(config.local_base_url.contains(":8080/"));
        assert_eq!(config.warmup_delay(), Duration::from_secs(10));
        assert_eq!(config.drain_window(), Duration::from_secs(1800));
        config.validate().unwrap();
    }

    #[test]
    fn local_base_url_is_normalized() {
        let config = RelayConfig {
            local_base_url: "http://localhost:9090/cache".to_string(),
            ..RelayConfig::default()
        };
        assert_eq!(
            config.normalized_local_base_url(),
            "http://localhost:9090/cache/"
        );
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let config = RelayConfig {
            local_base_url: "not a url".to_string(),
            ..RelayConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
