//! Origin allocation API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::OriginError;
use crate::models::{ProfileSpec, StreamDescriptor, StreamProfile};

/// Seam for the origin allocation call so sessions can run against fakes.
#[async_trait]
pub trait StreamAllocator: Send + Sync {
    async fn allocate_stream(
        &self,
        name: &str,
        profiles: &[ProfileSpec],
    ) -> Result<StreamDescriptor, OriginError>;
}

/// Connection settings for the origin REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Base URL of the origin REST API.
    pub api_base_url: String,
    /// Base URL the origin serves playback endpoints from.
    pub playback_base_url: String,
    /// Bearer token for the REST API.
    pub api_key: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://livepeer.studio/api".to_string(),
            playback_base_url: "https://cdn.livepeer.studio".to_string(),
            api_key: String::new(),
        }
    }
}

pub struct OriginClient {
    config: OriginConfig,
    client: Client,
}

#[derive(Serialize)]
struct CreateStreamRequest<'a> {
    name: &'a str,
    profiles: Vec<WireProfile<'a>>,
}

#[derive(Serialize)]
struct WireProfile<'a> {
    name: &'a str,
    width: u32,
    height: u32,
    bitrate: u64,
}

#[derive(Debug, Deserialize)]
struct CreateStreamResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "playbackId")]
    playback_id: Option<String>,
    #[serde(default, rename = "rtmpIngestUrl")]
    rtmp_ingest_url: String,
    #[serde(default)]
    profiles: Vec<ResponseProfile>,
}

#[derive(Debug, Deserialize)]
struct ResponseProfile {
    name: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    bitrate: u64,
}

impl OriginClient {
    pub fn new(config: OriginConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn stream_endpoint(&self) -> Result<Url, OriginError> {
        let endpoint = format!("{}/stream", self.config.api_base_url.trim_end_matches('/'));
        Url::parse(&endpoint).map_err(|e| {
            OriginError::configuration(format!("invalid origin API base URL `{endpoint}`: {e}"))
        })
    }

    /// HLS playback URL the origin serves one rendition of a stream from.
    fn playback_url(&self, playback_id: &str, profile_name: &str) -> String {
        format!(
            "{}/hls/{playback_id}/{profile_name}/index.m3u8",
            self.config.playback_base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl StreamAllocator for OriginClient {
    async fn allocate_stream(
        &self,
        name: &str,
        profiles: &[ProfileSpec],
    ) -> Result<StreamDescriptor, OriginError> {
        let endpoint = self.stream_endpoint()?;
        let request = CreateStreamRequest {
            name,
            profiles: profiles
                .iter()
                .map(|p| WireProfile {
                    name: &p.name,
                    width: p.width,
                    height: p.height,
                    bitrate: p.bitrate_bps,
                })
                .collect(),
        };

        debug!(%endpoint, stream = name, "requesting stream allocation");
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OriginError::Allocation { status, body });
        }

        let parsed: CreateStreamResponse = response.json().await?;
        let profiles = parsed
            .profiles
            .iter()
            .map(|p| StreamProfile {
                name: p.name.clone(),
                width: p.width,
                height: p.height,
                bitrate_bps: p.bitrate,
                remote_url: parsed
                    .playback_id
                    .as_deref()
                    .map(|id| self.playback_url(id, &p.name)),
            })
            .collect::<Vec<_>>();

        info!(
            stream_id = %parsed.id,
            ingest_url = %parsed.rtmp_ingest_url,
            profile_count = profiles.len(),
            "origin allocated stream"
        );

        Ok(StreamDescriptor {
            id: parsed.id,
            name: parsed.name,
            ingest_url: parsed.rtmp_ingest_url,
            profiles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with(playback_base_url: &str) -> OriginClient {
        OriginClient::new(
            OriginConfig {
                playback_base_url: playback_base_url.to_string(),
                ..OriginConfig::default()
            },
            Client::new(),
        )
    }

    #[test]
    fn request_uses_origin_wire_field_names() {
        let request = CreateStreamRequest {
            name: "demo",
            profiles: vec![WireProfile {
                name: "480p",
                width: 854,
                height: 480,
                bitrate: 1_000_000,
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["profiles"][0]["bitrate"], 1_000_000);
        assert!(json["profiles"][0].get("bitrate_bps").is_none());
    }

    #[test]
    fn response_parses_camel_case_fields() {
        let raw = r#"{
            "id": "abc-123",
            "name": "demo",
            "playbackId": "xyz789",
            "rtmpIngestUrl": "rtmp://ingest.example/live/key",
            "profiles": [{"name": "480p", "width": 854, "height": 480, "bitrate": 1000000}]
        }"#;
        let parsed: CreateStreamResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.id, "abc-123");
        assert_eq!(parsed.playback_id.as_deref(), Some("xyz789"));
        assert_eq!(parsed.rtmp_ingest_url, "rtmp://ingest.example/live/key");
        assert_eq!(parsed.profiles[0].bitrate, 1_000_000);
    }

    #[test]
    fn playback_url_joins_base_id_and_profile() {
        let client = client_with("https://cdn.example/");
        assert_eq!(
            client.playback_url("xyz789", "480p"),
            "https://cdn.example/hls/xyz789/480p/index.m3u8"
        );
    }

    #[test]
    fn stream_endpoint_tolerates_trailing_slash() {
        let client = OriginClient::new(
            OriginConfig {
                api_base_url: "https://origin.example/api/".to_string(),
                ..OriginConfig::default()
            },
            Client::new(),
        );
        assert_eq!(
            client.stream_endpoint().unwrap().as_str(),
            "https://origin.example/api/stream"
        );
    }
}
