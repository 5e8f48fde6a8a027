//! In-chapter table of contents derived from rendered headings
//!
//! Rebuilt after every chapter load: second- and third-level headings get
//! stable `heading-<ordinal>` anchors (scoped to the current chapter) and an
//! ordered entry list for the TOC panel.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// One TOC entry, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// Anchor id injected into the heading (`heading-<ordinal>`)
    pub anchor: String,
    /// Heading level, 2 or 3
    pub level: u8,
    /// Heading text with markup stripped
    pub text: String,
}

/// A rebuilt table of contents plus the fragment with anchors injected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toc {
    pub html: String,
    pub entries: Vec<TocEntry>,
}

impl Toc {
    /// An empty heading set renders an explicit placeholder, not an empty
    /// list.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<(h[23])\b([^>]*)>(.*?)</h[23]\s*>").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn id_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\s+id\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).unwrap())
}

/// Scan a chapter fragment for `<h2>`/`<h3>` headings, inject
/// `heading-<ordinal>` ids, and collect the entry list.
///
/// Ordinals count both levels together, in document order, restarting at 0
/// for each chapter. Any pre-existing id on a heading is replaced so anchors
/// stay unique within the chapter.
pub fn build_toc(fragment: &str) -> Toc {
    let mut entries = Vec::new();
    let html = heading_re()
        .replace_all(fragment, |caps: &Captures<'_>| {
            let ordinal = entries.len();
            let anchor = format!("heading-{ordinal}");
            let tag = caps[1].to_lowercase();
            let level = if tag == "h2" { 2 } else { 3 };
            let attrs = id_attr_re().replace_all(&caps[2], "");
            let inner = &caps[3];
            let text = tag_re().replace_all(inner, "").trim().to_string();
            entries.push(TocEntry {
                anchor: anchor.clone(),
                level,
                text,
            });
            format!("<{tag} id=\"{anchor}\"{attrs}>{inner}</{tag}>")
        })
        .into_owned();
    Toc { html, entries }
}
