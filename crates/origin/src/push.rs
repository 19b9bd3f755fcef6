//! FFmpeg ingest push engine.

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::OriginError;

/// Completion status and captured diagnostics of one encoder push.
#[derive(Debug, Clone)]
pub struct PushReport {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Tail of the encoder's stderr output.
    pub diagnostics: String,
}

/// Seam for the encoder push activity so sessions can run against fakes.
#[async_trait]
pub trait IngestPush: Send + Sync {
    async fn push(&self, input: &Path, ingest_url: &str) -> Result<PushReport, OriginError>;
}

#[derive(Debug, Clone)]
pub struct FfmpegPushConfig {
    pub binary_path: String,
    pub video_codec: String,
    /// Encoding speed/quality balance.
    pub preset: String,
    pub audio_codec: String,
    /// Extra output arguments appended before the format flag.
    pub extra_args: Vec<String>,
}

impl Default for FfmpegPushConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            audio_codec: "aac".to_string(),
            extra_args: Vec::new(),
        }
    }
}

/// FFmpeg-based push engine: reads a local file at native frame rate and
/// delivers it to the origin's ingest endpoint as an FLV stream.
pub struct FfmpegPush {
    config: FfmpegPushConfig,
    /// Cached version string, probed once at construction.
    version: Option<String>,
}

impl FfmpegPush {
    pub fn new() -> Self {
        Self::with_config(FfmpegPushConfig::default())
    }

    pub fn with_config(config: FfmpegPushConfig) -> Self {
        let version = Self::detect_version(&config.binary_path);
        Self { config, version }
    }

    fn detect_version(path: &str) -> Option<String> {
        std::process::Command::new(path)
            .arg("-version")
            .output()
            .ok()
            .and_then(|output| {
                String::from_utf8(output.stdout)
                    .ok()
                    .and_then(|s| s.lines().next().map(|l| l.to_string()))
            })
    }

    pub fn is_available(&self) -> bool {
        self.version.is_some()
    }

    pub fn version(&self) -> Option<String> {
        self.version.clone()
    }

    fn build_args(&self, input: &Path, ingest_url: &str) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            // Read the input at native frame rate so a file behaves like a live feed.
            "-re".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-c:v".to_string(),
            self.config.video_codec.clone(),
            "-preset".to_string(),
            self.config.preset.clone(),
            "-c:a".to_string(),
            self.config.audio_codec.clone(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args.extend(["-f".to_string(), "flv".to_string(), ingest_url.to_string()]);
        args
    }
}

impl Default for FfmpegPush {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IngestPush for FfmpegPush {
    async fn push(&self, input: &Path, ingest_url: &str) -> Result<PushReport, OriginError> {
        if !input.exists() {
            return Err(OriginError::push(format!(
                "input file not found: {}",
                input.display()
            )));
        }

        let args = self.build_args(input, ingest_url);
        info!(
            binary = %self.config.binary_path,
            input = %input.display(),
            "starting encoder push"
        );

        let mut child = Command::new(&self.config.binary_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                OriginError::push(format!("failed to spawn {}: {e}", self.config.binary_path))
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| OriginError::push("failed to capture encoder stderr"))?;

        let mut tail = DiagnosticsTail::new(64);
        let mut lines = BufReader::new(stderr).lines();
        while let Some(line) = lines.next_line().await? {
            debug!("ffmpeg: {line}");
            tail.push(line);
        }

        let status = child.wait().await?;
        let exit_code = status.code();
        if status.success() {
            info!("encoder push finished");
        } else {
            warn!(?exit_code, "encoder push exited with failure");
        }

        Ok(PushReport {
            success: status.success(),
            exit_code,
            diagnostics: tail.join(),
        })
    }
}

/// Keeps the last N diagnostic lines so a long-running encode cannot grow the
/// session report without bound.
struct DiagnosticsTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticsTail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn join(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn build_args_matches_push_command() {
        let push = FfmpegPush::with_config(FfmpegPushConfig {
            binary_path: "missing-encoder-binary".to_string(),
            ..FfmpegPushConfig::default()
        });
        let args = push.build_args(Path::new("video.mp4"), "rtmp://ingest.example/live/key");
        assert_eq!(
            args,
            vec![
                "-hide_banner",
                "-re",
                "-i",
                "video.mp4",
                "-c:v",
                "libx264",
                "-preset",
                "medium",
                "-c:a",
                "aac",
                "-f",
                "flv",
                "rtmp://ingest.example/live/key",
            ]
        );
    }

    #[test]
    fn missing_binary_is_reported_unavailable() {
        let push = FfmpegPush::with_config(FfmpegPushConfig {
            binary_path: "definitely-not-an-encoder".to_string(),
            ..FfmpegPushConfig::default()
        });
        assert!(!push.is_available());
        assert!(push.version().is_none());
    }

    #[tokio::test]
    async fn missing_input_fails_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let missing: PathBuf = dir.path().join("nope.mp4");
        let push = FfmpegPush::with_config(FfmpegPushConfig {
            binary_path: "definitely-not-an-encoder".to_string(),
            ..FfmpegPushConfig::default()
        });
        let err = push
            .push(&missing, "rtmp://ingest.example/live/key")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("input file not found"));
    }

    #[test]
    fn diagnostics_tail_is_bounded() {
        let mut tail = DiagnosticsTail::new(3);
        for i in 0..10 {
            tail.push(format!("line {i}"));
        }
        assert_eq!(tail.join(), "line 7\nline 8\nline 9");
    }
}
