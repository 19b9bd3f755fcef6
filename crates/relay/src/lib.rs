//! Cache-and-relay engine for adaptive-bitrate HLS streams.
//!
//! Mirrors a remote origin's per-profile playlists and segments into a local
//! cache and serves the cache from a local HTTP endpoint, while a concurrently
//! running encoder push is still feeding the origin. [`SessionOrchestrator`]
//! ties the pieces together for one streaming session.

pub mod clock;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod filler;
pub mod playlist;
pub mod server;
pub mod session;

pub use clock::{Clock, SystemClock};
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use fetcher::{FetchOutcome, SegmentFetcher};
pub use filler::{CacheFiller, LocalUrlMap};
pub use playlist::{RewrittenPlaylist, SegmentRef, rewrite_playlist};
pub use server::{ContentServer, PLAYLIST_CONTENT_TYPE, SEGMENT_CONTENT_TYPE};
pub use session::{
    CacheSummary, PushSummary, SessionOrchestrator, SessionReport, SessionState, StageReport,
    StreamSummary,
};
