//! Configuration file discovery and parsing
//!
//! Searches for `.config/lectern.toml` walking up from the current directory.
//! The project root is the parent of `.config/`. Everything has a default, so
//! a missing config file yields a usable setup for local reading.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{Result, eyre};
use serde::Deserialize;
use std::env;
use std::fs;

const CONFIG_DIR: &str = ".config";
const CONFIG_FILE: &str = "lectern.toml";

/// Where the reader fetches chapter documents from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    /// Pre-rendered files under `/chapters/<id>.html`
    #[default]
    Static,
    /// The chapter API under `/api/chapter/<id>`
    Api,
}

/// Lectern configuration from `.config/lectern.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LecternConfig {
    /// Base URL the reader fetches from. Defaults to the local server.
    pub base_url: Option<String>,

    /// Directory holding the pre-rendered chapter HTML files, relative to
    /// the project root. The single authoritative location; the server never
    /// probes alternates.
    pub chapter_root: Option<String>,

    /// Directory of static assets served below the chapter routes
    /// (index page, stylesheets), relative to the project root.
    pub public: Option<String>,

    /// Optional JSON catalog file, relative to the project root. Absent
    /// means the built-in catalog.
    pub catalog: Option<String>,

    /// Whether the reader uses the static chapter files or the chapter API.
    pub content_source: Option<ContentSource>,

    /// Directory for reader state (theme preference, offline cache).
    /// Defaults to the platform state directory.
    pub state_dir: Option<String>,
}

/// Discovered configuration with resolved paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Project root (parent of .config/), or the current directory when no
    /// config file was found
    pub root: Utf8PathBuf,
    pub base_url: String,
    /// Absolute path to the chapter HTML directory
    pub chapter_root: Utf8PathBuf,
    /// Absolute path to the static asset directory
    pub public_dir: Utf8PathBuf,
    /// Absolute path to a JSON catalog file, if configured
    pub catalog_file: Option<Utf8PathBuf>,
    pub content_source: ContentSource,
    /// Absolute path to the reader state directory
    pub state_dir: Utf8PathBuf,
}

impl ResolvedConfig {
    /// Discover and load configuration from the current directory. No config
    /// file means defaults anchored at the current directory.
    pub fn discover() -> Result<Self> {
        let cwd = env::current_dir()?;
        let cwd = Utf8PathBuf::try_from(cwd)
            .map_err(|e| eyre!("current directory is not valid UTF-8: {}", e.as_path().display()))?;

        match find_config_file(&cwd) {
            Some(path) => load_config(&path),
            None => resolve(LecternConfig::default(), &cwd),
        }
    }

    /// Load configuration anchored at a specific project path.
    pub fn discover_from(project_path: &Utf8Path) -> Result<Self> {
        let config_file = project_path.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_file.exists() {
            load_config(&config_file)
        } else {
            resolve(LecternConfig::default(), project_path)
        }
    }
}

/// Search for `.config/lectern.toml` walking up from `start`
fn find_config_file(start: &Utf8Path) -> Option<Utf8PathBuf> {
    let mut current = start;
    loop {
        let config_file = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_file.exists() {
            return Some(config_file);
        }
        current = current.parent()?;
    }
}

fn load_config(config_path: &Utf8Path) -> Result<ResolvedConfig> {
    let content = fs::read_to_string(config_path)?;
    let config: LecternConfig = toml::from_str(&content)
        .map_err(|e| eyre!("while loading {config_path}: {e}"))?;

    // Project root is the parent of .config/
    let root = config_path
        .parent()
        .and_then(Utf8Path::parent)
        .ok_or_else(|| eyre!(".config directory has no parent"))?
        .to_owned();

    resolve(config, &root)
}

fn resolve(config: LecternConfig, root: &Utf8Path) -> Result<ResolvedConfig> {
    let chapter_root = root.join(config.chapter_root.as_deref().unwrap_or("chapters"));
    let public_dir = root.join(config.public.as_deref().unwrap_or("public"));
    let catalog_file = config.catalog.as_deref().map(|p| root.join(p));

    let state_dir = match config.state_dir {
        Some(dir) => root.join(dir),
        None => default_state_dir()?,
    };

    Ok(ResolvedConfig {
        root: root.to_owned(),
        base_url: config
            .base_url
            .unwrap_or_else(|| "http://localhost:4000".to_string()),
        chapter_root,
        public_dir,
        catalog_file,
        content_source: config.content_source.unwrap_or_default(),
        state_dir,
    })
}

fn default_state_dir() -> Result<Utf8PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .ok_or_else(|| eyre!("no state directory available on this platform"))?;
    let dir = Utf8PathBuf::try_from(base)
        .map_err(|e| eyre!("state directory is not valid UTF-8: {}", e.as_path().display()))?;
    Ok(dir.join("lectern"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_config() {
        let toml = r#"
            base-url = "http://localhost:8080"
            chapter-root = "docs/chapters"
            public = "docs"
            catalog = "docs/chapters.json"
            content-source = "api"
            state-dir = ".lectern"
        "#;
        let config: LecternConfig = toml::from_str(toml).unwrap();
        let resolved = resolve(config, Utf8Path::new("/project")).unwrap();

        assert_eq!(resolved.base_url, "http://localhost:8080");
        assert_eq!(resolved.chapter_root, "/project/docs/chapters");
        assert_eq!(resolved.public_dir, "/project/docs");
        assert_eq!(
            resolved.catalog_file.as_deref(),
            Some(Utf8Path::new("/project/docs/chapters.json"))
        );
        assert_eq!(resolved.content_source, ContentSource::Api);
        assert_eq!(resolved.state_dir, "/project/.lectern");
    }

    #[test]
    fn empty_config_gets_defaults() {
        let config: LecternConfig = toml::from_str("").unwrap();
        let resolved = resolve(config, Utf8Path::new("/project")).unwrap();

        assert_eq!(resolved.base_url, "http://localhost:4000");
        assert_eq!(resolved.chapter_root, "/project/chapters");
        assert_eq!(resolved.public_dir, "/project/public");
        assert!(resolved.catalog_file.is_none());
        assert_eq!(resolved.content_source, ContentSource::Static);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<LecternConfig>("chapters-dir = \"x\"").is_err());
    }

    #[test]
    fn discover_from_reads_the_config_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join(CONFIG_DIR)).unwrap();
        fs::write(
            root.join(CONFIG_DIR).join(CONFIG_FILE),
            "chapter-root = \"book\"\nstate-dir = \".state\"\n",
        )
        .unwrap();

        let resolved = ResolvedConfig::discover_from(&root).unwrap();
        assert_eq!(resolved.chapter_root, root.join("book"));
        assert_eq!(resolved.root, root);
    }

    #[test]
    fn discover_from_without_config_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let resolved = ResolvedConfig::discover_from(&root).unwrap();
        assert_eq!(resolved.chapter_root, root.join("chapters"));
        assert_eq!(resolved.content_source, ContentSource::Static);
    }
}
