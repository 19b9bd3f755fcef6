//! Session orchestrator: one streaming session from allocation to shutdown.
//!
//! Coordinates three independently scheduled activities (encoder push, cache
//! fill, and the content server's request loop) that share nothing but the
//! cache-root subtree. Only allocation failure is fatal; every other failure
//! is logged and folded into the session report.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use origin_client::{IngestPush, ProfileSpec, StreamAllocator, StreamDescriptor};

use crate::clock::{Clock, SystemClock};
use crate::config::RelayConfig;
use crate::filler::{CacheFiller, LocalUrlMap};
use crate::server::ContentServer;

/// Lifecycle of one streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Pushing,
    WarmingUp,
    Serving,
    Draining,
    Closed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Pushing => "pushing",
            Self::WarmingUp => "warming-up",
            Self::Serving => "serving",
            Self::Draining => "draining",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one pipeline stage. Structural, so callers inspect variants
/// instead of parsing error strings.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageReport<T> {
    Completed { detail: T },
    Failed { error: String },
    Skipped,
}

impl<T> StageReport<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn detail(&self) -> Option<&T> {
        match self {
            Self::Completed { detail } => Some(detail),
            _ => None,
        }
    }
}

/// Descriptor fields surfaced in the session report.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSummary {
    pub stream_id: String,
    pub stream_name: String,
    pub ingest_url: String,
    pub playback_urls: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushSummary {
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheSummary {
    pub local_playback_urls: LocalUrlMap,
}

/// Aggregated result of one session. All three stage fields are present for
/// every session, whatever failed along the way.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub allocation: StageReport<StreamSummary>,
    pub push: StageReport<PushSummary>,
    pub cache: StageReport<CacheSummary>,
}

impl SessionReport {
    pub fn local_playback_urls(&self) -> Option<&LocalUrlMap> {
        self.cache.detail().map(|c| &c.local_playback_urls)
    }

    fn failed_allocation(error: String) -> Self {
        Self {
            allocation: StageReport::Failed { error },
            push: StageReport::Skipped,
            cache: StageReport::Skipped,
        }
    }
}

pub struct SessionOrchestrator {
    config: RelayConfig,
    allocator: Arc<dyn StreamAllocator>,
    push_engine: Arc<dyn IngestPush>,
    clock: Arc<dyn Clock>,
    client: reqwest::Client,
}

impl SessionOrchestrator {
    pub fn new(
        config: RelayConfig,
        allocator: Arc<dyn StreamAllocator>,
        push_engine: Arc<dyn IngestPush>,
    ) -> Self {
        Self {
            config,
            allocator,
            push_engine,
            clock: Arc::new(SystemClock),
            client: reqwest::Client::new(),
        }
    }

    /// Replace the wall clock, so tests can elide the warm-up and drain waits.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share an HTTP client with the rest of the application.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Run one session to completion. Never returns an error: partial
    /// failures are recorded in the report.
    pub async fn run(
        &self,
        input: &Path,
        stream_name: &str,
        profiles: &[ProfileSpec],
    ) -> SessionReport {
        let mut state = SessionState::Created;
        info!(stream = stream_name, input = %input.display(), "session created");

        let descriptor = match self.allocator.allocate_stream(stream_name, profiles).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                error!(%err, "stream allocation failed, aborting session");
                transition(&mut state, SessionState::Failed);
                return SessionReport::failed_allocation(err.to_string());
            }
        };
        let allocation = StageReport::Completed {
            detail: summarize(&descriptor),
        };

        transition(&mut state, SessionState::Pushing);
        let push_task = {
            let push_engine = Arc::clone(&self.push_engine);
            let ingest_url = descriptor.ingest_url.clone();
            let input = input.to_path_buf();
            tokio::spawn(async move { push_engine.push(&input, &ingest_url).await })
        };

        // Blind timer, not a readiness probe: gives the remote transcoder a
        // chance to initialize before playback endpoints are assumed live.
        transition(&mut state, SessionState::WarmingUp);
        self.clock.sleep(self.config.warmup_delay()).await;

        transition(&mut state, SessionState::Serving);
        let mut server_cancel = None;
        let mut server_task = None;
        let mut fill_task = None;
        let mut cache_failure = None;

        if self.config.cache_enabled {
            let server = ContentServer::new(
                &self.config.bind_address,
                self.config.server_port,
                &self.config.cache_root,
            );
            let cancel = server.cancel_token();
            // The listener must accept connections before the fill starts, so
            // early viewers get 404s instead of connection failures.
            match server.bind().await {
                Ok(bound) => {
                    server_task = Some(tokio::spawn(bound.serve()));
                    server_cancel = Some(cancel);

                    let filler = CacheFiller::new(self.client.clone());
                    let descriptor = descriptor.clone();
                    let cache_root = self.config.cache_root.clone();
                    let local_base_url = self.config.normalized_local_base_url();
                    fill_task = Some(tokio::spawn(async move {
                        filler
                            .fill(&descriptor, &cache_root, &local_base_url, true)
                            .await
                    }));
                }
                Err(err) => {
                    error!(%err, "failed to start content server");
                    cache_failure = Some(err.to_string());
                }
            }
        }

        let push = match push_task.await {
            Ok(Ok(report)) if report.success => {
                info!("encoder push completed");
                StageReport::Completed {
                    detail: PushSummary {
                        exit_code: report.exit_code,
                    },
                }
            }
            Ok(Ok(report)) => {
                warn!(
                    exit_code = ?report.exit_code,
                    diagnostics = %report.diagnostics,
                    "encoder push failed"
                );
                StageReport::Failed {
                    error: match report.exit_code {
                        Some(code) => format!("encoder exited with code {code}"),
                        None => "encoder terminated by signal".to_string(),
                    },
                }
            }
            Ok(Err(err)) => {
                warn!(%err, "encoder push failed");
                StageReport::Failed {
                    error: err.to_string(),
                }
            }
            Err(err) => {
                warn!(%err, "encoder push task aborted");
                StageReport::Failed {
                    error: err.to_string(),
                }
            }
        };

        let cache = if !self.config.cache_enabled {
            StageReport::Completed {
                detail: CacheSummary {
                    local_playback_urls: LocalUrlMap::new(),
                },
            }
        } else if let Some(error) = cache_failure {
            StageReport::Failed { error }
        } else if let Some(task) = fill_task {
            match task.await {
                Ok(local_playback_urls) => StageReport::Completed {
                    detail: CacheSummary {
                        local_playback_urls,
                    },
                },
                Err(err) => StageReport::Failed {
                    error: err.to_string(),
                },
            }
        } else {
            StageReport::Skipped
        };

        // Viewers can keep consuming cached content after ingestion is done.
        if server_task.is_some() {
            transition(&mut state, SessionState::Draining);
            self.clock.sleep(self.config.drain_window()).await;
        }

        transition(&mut state, SessionState::Closed);
        if let Some(cancel) = server_cancel {
            cancel.cancel();
        }
        if let Some(task) = server_task {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(%err, "content server exited with error"),
                Err(err) => warn!(%err, "content server task aborted"),
            }
        }

        SessionReport {
            allocation,
            push,
            cache,
        }
    }
}

fn transition(state: &mut SessionState, next: SessionState) {
    info!(from = %state, to = %next, "session state change");
    *state = next;
}

fn summarize(descriptor: &StreamDescriptor) -> StreamSummary {
    StreamSummary {
        stream_id: descriptor.id.clone(),
        stream_name: descriptor.name.clone(),
        ingest_url: descriptor.ingest_url.clone(),
        playback_urls: descriptor
            .profiles
            .iter()
            .filter_map(|p| p.remote_url.clone().map(|url| (p.name.clone(), url)))
            .collect(),
    }
}
