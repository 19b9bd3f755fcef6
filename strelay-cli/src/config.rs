//! TOML-backed application configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use origin_client::{OriginConfig, ProfileSpec, default_ladder};
use relay_engine::RelayConfig;

use crate::error::{CliError, Result};

/// Environment variable that overrides the configured origin API key.
pub const API_KEY_ENV: &str = "STRELAY_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Stream name registered with the origin.
    pub stream_name: String,
    /// Rendition ladder requested at allocation.
    pub profiles: Vec<ProfileSpec>,
    pub origin: OriginConfig,
    pub relay: RelayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stream_name: "decentralized-video-stream".to_string(),
            profiles: default_ladder(),
            origin: OriginConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("strelay").join("config.toml"))
    }

    /// Load from the given path, the default path, or fall back to defaults.
    /// The origin API key can always be supplied from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let candidate = path.map(PathBuf::from).or_else(Self::default_path);
        let mut config = match candidate {
            Some(ref file) if file.exists() => {
                let raw = fs::read_to_string(file)?;
                toml::from_str(&raw)
                    .map_err(|e| CliError::Config(format!("{}: {e}", file.display())))?
            }
            _ => Self::default(),
        };

        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            config.origin.api_key = key;
        }

        Ok(config)
    }

    /// Write the default configuration to disk and return its path.
    pub fn reset(path: Option<&Path>) -> Result<PathBuf> {
        let target = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .ok_or_else(|| CliError::Config("no configuration directory available".to_string()))?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, toml::to_string_pretty(&Self::default())?)?;
        Ok(target)
    }

    /// Rendered configuration with the API key redacted.
    pub fn show(&self) -> Result<String> {
        let mut redacted = self.clone();
        if !redacted.origin.api_key.is_empty() {
            redacted.origin.api_key = "<redacted>".to_string();
        }
        Ok(toml::to_string_pretty(&redacted)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("missing.toml"))).unwrap();
        assert_eq!(config.stream_name, "decentralized-video-stream");
        assert_eq!(config.profiles.len(), 3);
        assert!(config.relay.cache_enabled);
    }

    #[test]
    fn reset_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let written = AppConfig::reset(Some(&path)).unwrap();
        assert_eq!(written, path);

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.relay.server_port, 8080);
        assert_eq!(config.profiles[0].name, "720p");
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "stream_name = \"my-stream\"\n\n[relay]\nserver_port = 9090\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.stream_name, "my-stream");
        assert_eq!(config.relay.server_port, 9090);
        assert!(config.relay.cache_enabled);
        assert_eq!(config.profiles.len(), 3);
    }

    #[test]
    fn show_redacts_the_api_key() {
        let mut config = AppConfig::default();
        config.origin.api_key = "super-secret".to_string();
        let rendered = config.show().unwrap();
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
