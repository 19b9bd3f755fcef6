//! Client-side collaborators of the streaming origin: stream allocation and
//! encoder ingest push.
//!
//! The rest of the pipeline only ever sees the [`StreamAllocator`] and
//! [`IngestPush`] seams; the concrete implementations here talk to the origin
//! REST API over HTTP and drive an external ffmpeg process.

pub mod client;
pub mod error;
pub mod models;
pub mod push;

pub use client::{OriginClient, OriginConfig, StreamAllocator};
pub use error::OriginError;
pub use models::{ProfileSpec, StreamDescriptor, StreamProfile, default_ladder};
pub use push::{FfmpegPush, FfmpegPushConfig, IngestPush, PushReport};
