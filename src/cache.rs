//! Offline chapter cache
//!
//! Pre-populates an on-disk cache of known chapter documents so the reader
//! keeps working without a network. Strategy is network-first: the cache is
//! consulted only after a transport failure, and a miss falls back to a
//! designated offline document. The cache is a cache, never authoritative.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

use crate::catalog::is_valid_slug;
use crate::loader::ChapterFetcher;

/// Shown when a chapter is unreachable and nothing is cached for it.
pub const OFFLINE_DOCUMENT: &str = "<div class=\"offline\">\
<h2>You are offline</h2>\
<p>This chapter has not been cached yet. Reconnect and try again.</p>\
</div>";

/// On-disk store of raw chapter documents, one file per chapter id.
#[derive(Debug, Clone)]
pub struct OfflineCache {
    dir: Utf8PathBuf,
}

impl OfflineCache {
    pub fn open(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> Option<Utf8PathBuf> {
        if is_valid_slug(id) {
            Some(self.dir.join(format!("{id}.html")))
        } else {
            None
        }
    }

    /// Store the raw document for a chapter. Write failures are logged and
    /// swallowed; a broken cache must never break a successful load.
    pub fn store(&self, id: &str, document: &str) {
        let Some(path) = self.path_for(id) else {
            return;
        };
        if let Err(e) = fs::create_dir_all(&self.dir).and_then(|_| fs::write(&path, document)) {
            tracing::warn!("failed to cache chapter {id}: {e}");
        }
    }

    /// Cached document for a chapter, if present.
    pub fn lookup(&self, id: &str) -> Option<String> {
        let path = self.path_for(id)?;
        fs::read_to_string(path).ok()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.path_for(id)
            .map(|p| p.as_std_path().exists())
            .unwrap_or(false)
    }

    /// Fetch and cache every listed chapter. Individual failures are
    /// skipped; returns how many documents were stored.
    pub async fn prefetch<F: ChapterFetcher>(&self, fetcher: &F, ids: &[String]) -> usize {
        let mut stored = 0;
        for id in ids {
            match fetcher.fetch(id).await {
                Ok(document) => {
                    self.store(id, &document);
                    stored += 1;
                }
                Err(e) => {
                    tracing::warn!("prefetch skipped {id}: {e}");
                }
            }
        }
        if stored > 0 {
            tracing::info!("cached {stored} chapter(s) for offline reading");
        }
        stored
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadError;

    struct ScriptedFetcher;

    impl ChapterFetcher for ScriptedFetcher {
        async fn fetch(&self, id: &str) -> Result<String, LoadError> {
            match id {
                "missing" => Err(LoadError::NotFound { id: id.to_string() }),
                _ => Ok(format!("<html><body><main>{id}</main></body></html>")),
            }
        }
    }

    fn cache_in(tmp: &tempfile::TempDir) -> OfflineCache {
        OfflineCache::open(Utf8PathBuf::from_path_buf(tmp.path().join("cache")).unwrap())
    }

    #[test]
    fn store_then_lookup_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(&tmp);
        cache.store("preface", "<html>doc</html>");
        assert!(cache.contains("preface"));
        assert_eq!(cache.lookup("preface").as_deref(), Some("<html>doc</html>"));
    }

    #[test]
    fn lookup_misses_cleanly() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(&tmp);
        assert_eq!(cache.lookup("never_stored"), None);
        assert!(!cache.contains("never_stored"));
    }

    #[test]
    fn invalid_slugs_never_touch_the_filesystem() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(&tmp);
        cache.store("../escape", "nope");
        assert_eq!(cache.lookup("../escape"), None);
        assert!(!tmp.path().join("escape.html").exists());
    }

    #[tokio::test]
    async fn prefetch_caches_reachable_chapters_and_skips_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(&tmp);
        let ids = vec![
            "preface".to_string(),
            "missing".to_string(),
            "chapter14_gpt".to_string(),
        ];
        let stored = cache.prefetch(&ScriptedFetcher, &ids).await;
        assert_eq!(stored, 2);
        assert!(cache.contains("preface"));
        assert!(!cache.contains("missing"));
        assert!(cache.contains("chapter14_gpt"));
    }
}
