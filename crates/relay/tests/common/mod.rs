#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path as RequestPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use origin_client::{StreamDescriptor, StreamProfile};

/// Per-path request counts observed by the fixture origin.
pub type HitCounts = Arc<Mutex<HashMap<String, usize>>>;

#[derive(Clone)]
struct OriginFixture {
    root: PathBuf,
    hits: HitCounts,
}

/// Serve `root` on an ephemeral local port, counting requests per path.
/// Paths ending in `boom.ts` always answer 500, standing in for an origin
/// that fails one segment server-side.
pub async fn spawn_origin(root: PathBuf) -> (SocketAddr, HitCounts) {
    let hits: HitCounts = Arc::new(Mutex::new(HashMap::new()));
    let state = OriginFixture {
        root,
        hits: hits.clone(),
    };
    let app = Router::new()
        .route("/{*path}", get(serve_fixture))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

async fn serve_fixture(
    State(fixture): State<OriginFixture>,
    RequestPath(path): RequestPath<String>,
) -> Response {
    *fixture
        .hits
        .lock()
        .unwrap()
        .entry(path.clone())
        .or_insert(0) += 1;
    if path.ends_with("boom.ts") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    match tokio::fs::read(fixture.root.join(&path)).await {
        Ok(bytes) => bytes.into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "missing").into_response(),
    }
}

pub fn hit_count(hits: &HitCounts, path: &str) -> usize {
    hits.lock().unwrap().get(path).copied().unwrap_or(0)
}

/// Descriptor whose profiles all point at the fixture origin.
pub fn descriptor(addr: SocketAddr, profiles: &[&str]) -> StreamDescriptor {
    StreamDescriptor {
        id: "stream-1".to_string(),
        name: "demo".to_string(),
        ingest_url: "rtmp://ingest.example/live/key".to_string(),
        profiles: profiles
            .iter()
            .map(|name| StreamProfile {
                name: (*name).to_string(),
                width: 854,
                height: 480,
                bitrate_bps: 1_000_000,
                remote_url: Some(format!("http://{addr}/{name}/index.m3u8")),
            })
            .collect(),
    }
}
