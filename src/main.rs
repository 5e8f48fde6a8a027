use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::watch;

use lectern::cache::OfflineCache;
use lectern::catalog::Catalog;
use lectern::config::{ContentSource, ResolvedConfig};
use lectern::loader::HttpFetcher;
use lectern::logging;
use lectern::serve::{ChapterServer, bind_listener, run_server};
use lectern::session::ReaderSession;
use lectern::theme::ThemeStore;
use lectern::tui::{self, ReaderApp, ReaderViewModel};

#[derive(Parser)]
#[command(name = "lectern", about = "Read pre-rendered HTML textbooks in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the chapter catalog, chapter HTML, and diagrams
    Serve {
        /// Project directory (looks for .config/lectern.toml here)
        #[arg()]
        path: Option<Utf8PathBuf>,

        /// Chapter directory (uses .config/lectern.toml if not specified)
        #[arg(short, long)]
        chapters: Option<Utf8PathBuf>,

        /// Address to bind on
        #[arg(short, long, default_value = "127.0.0.1")]
        address: Ipv4Addr,

        /// Port to serve on (tries 4000-4019 if not specified)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Open the terminal reader
    Read {
        /// Project directory (looks for .config/lectern.toml here)
        #[arg()]
        path: Option<Utf8PathBuf>,

        /// Server to read from (uses .config/lectern.toml if not specified)
        #[arg(short, long)]
        url: Option<String>,

        /// Chapter to open on startup
        #[arg(long)]
        chapter: Option<String>,

        /// Fetch the catalog from the server instead of the built-in one
        #[arg(long)]
        api: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            path,
            chapters,
            address,
            port,
        } => {
            logging::init_standard_tracing();
            let config = resolve_config(path)?;
            let chapter_root = chapters.unwrap_or(config.chapter_root);
            serve(config.catalog_file, chapter_root, config.public_dir, address, port).await?;
        }
        Command::Read {
            path,
            url,
            chapter,
            api,
        } => {
            let config = resolve_config(path)?;
            let base_url = url.unwrap_or(config.base_url);
            let source = if api {
                ContentSource::Api
            } else {
                config.content_source
            };
            read(
                base_url,
                source,
                config.catalog_file,
                config.state_dir,
                chapter,
            )
            .await?;
        }
    }

    Ok(())
}

fn resolve_config(path: Option<Utf8PathBuf>) -> Result<ResolvedConfig> {
    match path {
        Some(project) => ResolvedConfig::discover_from(&project),
        None => ResolvedConfig::discover(),
    }
}

/// Load the catalog for serving: a configured JSON file wins over the
/// built-in book.
fn server_catalog(catalog_file: Option<Utf8PathBuf>) -> Result<Catalog> {
    match catalog_file {
        Some(path) => Ok(Catalog::from_json_file(&path)?),
        None => Ok(Catalog::builtin()),
    }
}

async fn serve(
    catalog_file: Option<Utf8PathBuf>,
    chapter_root: Utf8PathBuf,
    public_dir: Utf8PathBuf,
    address: Ipv4Addr,
    port: Option<u16>,
) -> Result<()> {
    let catalog = server_catalog(catalog_file)?;
    tracing::info!(
        "serving {} chapters from {chapter_root}",
        catalog.len()
    );

    let server = Arc::new(ChapterServer::new(catalog, chapter_root, public_dir));
    let bound = bind_listener(address, port).await?;
    tracing::info!("listening on http://{address}:{}", bound.port);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    run_server(server, bound, shutdown_rx).await
}

async fn read(
    base_url: String,
    source: ContentSource,
    catalog_file: Option<Utf8PathBuf>,
    state_dir: Utf8PathBuf,
    initial: Option<String>,
) -> Result<()> {
    let (event_tx, event_rx) = tui::event_channel();
    logging::init_tui_tracing(event_tx);

    let client = reqwest::Client::new();

    // A configured catalog file wins; the chapter API is consulted when the
    // reader runs against an API content source; otherwise the built-in book.
    let mut catalog_error = None;
    let catalog = match &catalog_file {
        Some(path) => Catalog::from_json_file(path)?,
        None if source == ContentSource::Api => {
            match Catalog::fetch(&client, &base_url).await {
                Ok(catalog) => catalog,
                Err(e) => {
                    catalog_error = Some(e.to_string());
                    Catalog::default()
                }
            }
        }
        None => Catalog::builtin(),
    };

    std::fs::create_dir_all(&state_dir)?;
    let theme = ThemeStore::open(&state_dir);
    let cache = OfflineCache::open(state_dir.join("offline"));
    let fetcher = HttpFetcher::new(client, base_url, source);

    let mut session = ReaderSession::new(
        catalog,
        fetcher,
        theme,
        Some(cache),
        ReaderViewModel::default(),
    );
    if let Some(message) = catalog_error {
        session.surface_catalog_error(&message);
    }

    // Warm the offline cache in the background while the reader runs
    if let Some(cache) = session.cache().cloned() {
        let fetcher = session.fetcher().clone();
        let ids: Vec<String> = session
            .catalog()
            .list()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        tokio::spawn(async move {
            cache.prefetch(&fetcher, &ids).await;
        });
    }

    let mut terminal = tui::init_terminal()?;
    let mut app = ReaderApp::new(session, event_rx);
    let handle = tokio::runtime::Handle::current();
    let result = tokio::task::block_in_place(|| {
        app.run(&mut terminal, &handle, initial.as_deref())
    });
    tui::restore_terminal()?;
    result
}
