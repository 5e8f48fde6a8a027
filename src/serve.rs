//! HTTP server for the chapter catalog, chapter documents, and diagrams
//!
//! Chapter HTML lives under a single configured root; there is exactly one
//! authoritative path per chapter and the server never probes alternates.
//! Chapter responses carry a revalidation cache policy so readers always see
//! fresh content while still allowing conditional requests.

use axum::{
    Router,
    body::Body,
    extract::{Path, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};

use color_eyre::Result;
use serde_json::json;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use camino::Utf8PathBuf;

use crate::catalog::{Catalog, is_valid_slug};

/// Cache-Control for chapter HTML: cacheable but always revalidated, so a
/// re-deployed chapter shows up on the next load.
const CACHE_REVALIDATE: &str = "public, max-age=0, must-revalidate";

/// Cache-Control for diagram assets, which change rarely.
const CACHE_DIAGRAMS: &str = "public, max-age=86400";

/// Shared state for the chapter server
pub struct ChapterServer {
    pub catalog: Catalog,
    /// Directory holding `<id>.html` chapter documents
    pub chapter_root: Utf8PathBuf,
    /// Static assets (index page, stylesheets) served at the root
    pub public_dir: Utf8PathBuf,
}

impl ChapterServer {
    pub fn new(catalog: Catalog, chapter_root: Utf8PathBuf, public_dir: Utf8PathBuf) -> Self {
        Self {
            catalog,
            chapter_root,
            public_dir,
        }
    }

    /// The single authoritative file path for a chapter id.
    fn chapter_path(&self, id: &str) -> Utf8PathBuf {
        self.chapter_root.join(format!("{id}.html"))
    }
}

fn html_response(status: StatusCode, cache: &'static str, body: String) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header(header::CACHE_CONTROL, cache)
        .body(Body::from(body))
        .unwrap()
}

fn not_found_json(id: &str, tried: &[String]) -> Response {
    let body = json!({
        "error": "Chapter not found",
        "id": id,
        "triedPaths": tried,
    });
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// GET /api/chapters - the catalog as JSON
async fn catalog_handler(State(server): State<Arc<ChapterServer>>) -> Response {
    match serde_json::to_string(server.catalog.list()) {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .header(header::CACHE_CONTROL, CACHE_REVALIDATE)
            .body(Body::from(body))
            .unwrap(),
        Err(e) => {
            tracing::error!("failed to serialize catalog: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /api/chapter/{id} and GET /chapters/{id}.html - one chapter document.
/// Slugs are restricted to catalog-shaped identifiers before touching the
/// filesystem, so traversal sequences never reach a path join.
async fn chapter_handler(
    State(server): State<Arc<ChapterServer>>,
    Path(id): Path<String>,
) -> Response {
    // Strip exactly one suffix so "a.html.html" never resolves as "a"
    let id = id.strip_suffix(".html").unwrap_or(&id);
    if !is_valid_slug(id) {
        return not_found_json(id, &[]);
    }

    let path = server.chapter_path(id);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => html_response(StatusCode::OK, CACHE_REVALIDATE, html),
        Err(e) => {
            tracing::warn!("chapter {id} not readable at {path}: {e}");
            not_found_json(id, &[path.to_string()])
        }
    }
}

/// GET /chapters/diagrams/{file} - diagram assets referenced by chapters
async fn diagram_handler(
    State(server): State<Arc<ChapterServer>>,
    Path(file): Path<String>,
) -> Response {
    // filename only; nested paths and dotfiles are rejected outright
    if file.contains('/') || file.contains('\\') || file.starts_with('.') || file.is_empty() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = server.chapter_root.join("diagrams").join(&file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime_from_extension(&file))
            .header(header::CACHE_CONTROL, CACHE_DIAGRAMS)
            .body(Body::from(bytes))
            .unwrap(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Fallback: static assets from the public directory ("/" maps to index.html)
async fn static_handler(State(server): State<Arc<ChapterServer>>, request: Request) -> Response {
    let path = request.uri().path();
    let rel = path.trim_start_matches('/');
    let rel = if rel.is_empty() { "index.html" } else { rel };

    // No parent traversal, no absolute components, no dotfiles
    if rel
        .split('/')
        .any(|seg| seg.is_empty() || seg.starts_with('.'))
    {
        return StatusCode::NOT_FOUND.into_response();
    }

    let full = server.public_dir.join(rel);
    match tokio::fs::read(&full).await {
        Ok(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime_from_extension(rel))
            .header(header::CACHE_CONTROL, CACHE_REVALIDATE)
            .body(Body::from(bytes))
            .unwrap(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Middleware to log HTTP requests with status code and latency
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

    if status >= 500 {
        tracing::error!("{} {} -> {} in {:.1}ms", method, path, status, latency_ms);
    } else if status >= 400 {
        tracing::warn!("{} {} -> {} in {:.1}ms", method, path, status, latency_ms);
    } else {
        tracing::info!("{} {} -> {} in {:.1}ms", method, path, status, latency_ms);
    }

    response
}

/// Build the axum router
pub fn build_router(server: Arc<ChapterServer>) -> Router {
    Router::new()
        .route("/api/chapters", get(catalog_handler))
        .route("/api/chapter/{id}", get(chapter_handler))
        .route("/chapters/diagrams/{file}", get(diagram_handler))
        .route("/chapters/{id}", get(chapter_handler))
        .fallback(static_handler)
        .with_state(server)
        .layer(middleware::from_fn(log_requests))
}

/// A bound listener ready to serve
pub struct BoundListener {
    pub listener: tokio::net::TcpListener,
    pub port: u16,
}

/// Bind a listener on the given IP.
/// - If `preferred` is Some(port), tries that exact port (returns error if unavailable)
/// - If `preferred` is None, tries 4000-4019, then lets OS choose (port 0)
pub async fn bind_listener(ip: Ipv4Addr, preferred: Option<u16>) -> Result<BoundListener> {
    use std::io::ErrorKind;

    if let Some(port) = preferred {
        let listener = tokio::net::TcpListener::bind(format!("{ip}:{port}")).await?;
        // If caller requested port 0, capture the OS-assigned port
        let port = if port == 0 {
            listener.local_addr()?.port()
        } else {
            port
        };
        return Ok(BoundListener { listener, port });
    }

    for port in 4000..4020 {
        match tokio::net::TcpListener::bind(format!("{ip}:{port}")).await {
            Ok(listener) => return Ok(BoundListener { listener, port }),
            Err(e) if e.kind() == ErrorKind::AddrInUse => continue,
            Err(e) => return Err(e.into()),
        }
    }

    // All preferred ports in use - let OS choose
    let listener = tokio::net::TcpListener::bind(format!("{ip}:0")).await?;
    let port = listener.local_addr()?.port();
    Ok(BoundListener { listener, port })
}

/// Serve on a pre-bound listener until shutdown is signalled
pub async fn run_server(
    server: Arc<ChapterServer>,
    bound: BoundListener,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let app = build_router(server);
    let shutdown_future = async move {
        while !*shutdown_rx.borrow() {
            if shutdown_rx.changed().await.is_err() {
                break;
            }
        }
    };

    axum::serve(bound.listener, app)
        .with_graceful_shutdown(shutdown_future)
        .await?;
    Ok(())
}

/// Guess MIME type from file extension
pub fn mime_from_extension(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
