//! Chapter loading: fetch raw HTML, extract the content region, and rewrite
//! diagram asset paths for insertion into the content view
//!
//! Fetching is behind the [`ChapterFetcher`] seam so the session logic (and
//! its last-issued-wins ordering) can be exercised without a network. The
//! HTML munging is regex-based; chapter documents are pre-rendered by a
//! known pipeline, not arbitrary web content.

use std::future::Future;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

use crate::config::ContentSource;

/// Canonical absolute path diagram references are rewritten to.
pub const DIAGRAM_BASE: &str = "/chapters/diagrams/";

/// The relative prefix chapter documents use for diagrams.
const DIAGRAM_RELATIVE: &str = "../diagrams/";

/// Result of one load attempt. Transient; never persisted.
pub type LoadResult = Result<String, LoadError>;

/// Failure loading a single chapter. Handled at the operation boundary and
/// surfaced as inline UI state; navigation state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Non-success status or unreadable response body
    NotFound { id: String },
    /// Transport-level failure (connection refused, DNS, timeout)
    Transport { id: String, detail: String },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::NotFound { id } => write!(f, "chapter {id} not found"),
            LoadError::Transport { id, detail } => {
                write!(f, "failed to fetch chapter {id}: {detail}")
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Seam between the session and the transport.
pub trait ChapterFetcher: Send + Sync {
    /// Fetch the raw HTML document for a chapter id.
    fn fetch(&self, id: &str) -> impl Future<Output = Result<String, LoadError>> + Send;
}

/// HTTP fetcher hitting the chapter server.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    source: ContentSource,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, source: ContentSource) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            source,
        }
    }

    /// Request URL for a chapter, with a cache-busting nonce. The nonce is
    /// part of the request only; it is never reflected in navigable state.
    fn chapter_url(&self, id: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        match self.source {
            ContentSource::Static => format!("{base}/chapters/{id}.html?v={nonce}"),
            ContentSource::Api => format!("{base}/api/chapter/{id}?v={nonce}"),
        }
    }
}

impl ChapterFetcher for HttpFetcher {
    async fn fetch(&self, id: &str) -> Result<String, LoadError> {
        let url = self.chapter_url(id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LoadError::Transport {
                id: id.to_string(),
                detail: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(LoadError::NotFound { id: id.to_string() });
        }
        resp.text().await.map_err(|_| LoadError::NotFound { id: id.to_string() })
    }
}

/// Fetch a chapter and prepare its displayable fragment.
pub async fn load_chapter<F: ChapterFetcher>(fetcher: &F, id: &str) -> LoadResult {
    let document = fetcher.fetch(id).await?;
    Ok(prepare_fragment(&document))
}

/// Extract the content region and rewrite diagram references.
pub fn prepare_fragment(document: &str) -> String {
    let region = extract_content_region(document);
    rewrite_diagram_paths(region)
}

fn main_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<main[^>]*>(.*?)</main>").unwrap())
}

fn body_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<body[^>]*>(.*?)</body>").unwrap())
}

fn diagram_src_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(src=["'])\.\./diagrams/"#).unwrap())
}

/// Locate the displayable subtree of a chapter document: the `<main>`
/// element if present, else the body, else the whole input.
pub fn extract_content_region(document: &str) -> &str {
    if let Some(caps) = main_re().captures(document) {
        return caps.get(1).map(|m| m.as_str()).unwrap_or(document);
    }
    if let Some(caps) = body_re().captures(document) {
        return caps.get(1).map(|m| m.as_str()).unwrap_or(document);
    }
    document
}

/// Rewrite relative diagram references to the canonical absolute path.
/// A fragment with no diagram references passes through unchanged; that is
/// a no-op, not an error.
pub fn rewrite_diagram_paths(fragment: &str) -> String {
    if !fragment.contains(DIAGRAM_RELATIVE) {
        return fragment.to_string();
    }
    diagram_src_re()
        .replace_all(fragment, format!("${{1}}{DIAGRAM_BASE}"))
        .into_owned()
}
