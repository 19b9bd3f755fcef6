//! Local content server: serves the cache root over HTTP so players can
//! resolve rewritten playlist references.
//!
//! Deliberately minimal: no authentication, no range requests, no caching
//! headers. Exactly four outcomes: file (200 with a media type picked by
//! extension), directory (200 HTML listing), missing (404), read failure
//! (500 with the error message).

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

use axum::Router;
use axum::extract::{Path as RequestPath, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{RelayError, Result};

pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
pub const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";

#[derive(Clone)]
struct ServerState {
    cache_root: PathBuf,
}

/// Content server configuration plus its shutdown token.
pub struct ContentServer {
    bind_address: String,
    port: u16,
    cache_root: PathBuf,
    cancel_token: CancellationToken,
}

impl ContentServer {
    pub fn new(bind_address: impl Into<String>, port: u16, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            bind_address: bind_address.into(),
            port,
            cache_root: cache_root.into(),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Token that stops the serve loop when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Router serving `/cache` and `/cache/{*path}` from `cache_root`.
    pub fn router(cache_root: PathBuf) -> Router {
        Router::new()
            .route("/cache", get(serve_cache_root))
            .route("/cache/{*path}", get(serve_cache_path))
            .with_state(ServerState { cache_root })
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the listener. Serving is split from binding so callers can rely
    /// on the endpoint accepting connections before dependent work starts.
    pub async fn bind(self) -> Result<BoundContentServer> {
        let addr: SocketAddr = format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| RelayError::configuration(format!("invalid bind address: {e}")))?;
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("content server listening on http://{local_addr}/cache/");
        Ok(BoundContentServer {
            listener,
            router: Self::router(self.cache_root),
            cancel_token: self.cancel_token,
            local_addr,
        })
    }
}

/// A content server with a bound listener, ready to serve.
pub struct BoundContentServer {
    listener: TcpListener,
    router: Router,
    cancel_token: CancellationToken,
    local_addr: SocketAddr,
}

impl BoundContentServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Serve until the cancellation token fires.
    pub async fn serve(self) -> Result<()> {
        let cancel_token = self.cancel_token;
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("content server shutting down");
            })
            .await?;
        Ok(())
    }
}

async fn serve_cache_root(State(state): State<ServerState>) -> Response {
    serve_resolved(state.cache_root.clone()).await
}

async fn serve_cache_path(
    State(state): State<ServerState>,
    RequestPath(path): RequestPath<String>,
) -> Response {
    let Some(resolved) = resolve_request_path(&state.cache_root, &path) else {
        return not_found();
    };
    serve_resolved(resolved).await
}

async fn serve_resolved(path: PathBuf) -> Response {
    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return not_found(),
        Err(err) => return internal_error(&path, err),
    };

    if metadata.is_dir() {
        return match render_listing(&path).await {
            Ok(html) => Html(html).into_response(),
            Err(err) => internal_error(&path, err),
        };
    }

    match tokio::fs::read(&path).await {
        Ok(contents) => (
            [(header::CONTENT_TYPE, content_type_for(&path))],
            contents,
        )
            .into_response(),
        Err(err) if err.kind() == ErrorKind::NotFound => not_found(),
        Err(err) => internal_error(&path, err),
    }
}

/// Resolve the request path inside the cache root. Parent or absolute
/// components would escape the cache and resolve to nothing.
fn resolve_request_path(cache_root: &Path, request: &str) -> Option<PathBuf> {
    let mut resolved = cache_root.to_path_buf();
    for component in Path::new(request).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(resolved)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("m3u8") => PLAYLIST_CONTENT_TYPE,
        _ => SEGMENT_CONTENT_TYPE,
    }
}

async fn render_listing(dir: &Path) -> std::io::Result<String> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    let mut html = String::from("<html><body><ul>");
    for name in &names {
        html.push_str(&format!("<li><a href=\"{name}\">{name}</a></li>"));
    }
    html.push_str("</ul></body></html>");
    Ok(html)
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "not found").into_response()
}

fn internal_error(path: &Path, err: std::io::Error) -> Response {
    warn!(path = %path.display(), %err, "failed to serve cached path");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
}
