//! Mediastash CLI - warm, inspect, and maintain a content cache
//! directory from the command line.

mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use mediastash::config::EngineConfig;
use mediastash::content::{ContentItem, ContentKind, ContentRef};
use mediastash::engine::CacheEngine;
use mediastash::fetch::ReqwestFetcher;
use mediastash::logging::init_logging;
use mediastash::preload::{PreloadProgress, PurchaseQuery};
use mediastash::Resolved;

use error::CliError;

#[derive(Debug, Clone, ValueEnum)]
enum KindArg {
    Image,
    Video,
    Pdf,
}

impl From<KindArg> for ContentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Image => ContentKind::Image,
            KindArg::Video => ContentKind::Video,
            KindArg::Pdf => ContentKind::Pdf,
        }
    }
}

#[derive(Parser)]
#[command(name = "mediastash", version = mediastash::VERSION)]
#[command(about = "Content cache and preload engine", long_about = None)]
struct Args {
    /// Cache directory (defaults to the platform cache dir)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download every item in a JSON manifest into the cache
    Preload {
        /// Manifest file: a JSON array of content items
        manifest: PathBuf,
    },
    /// Resolve a URL against the cache
    Resolve {
        url: String,
        #[arg(long, value_enum, default_value = "image")]
        kind: KindArg,
    },
    /// Download one object into the cache
    Fetch {
        url: String,
        #[arg(long, value_enum, default_value = "image")]
        kind: KindArg,
    },
    /// Evict the oldest-sorting files if the cache is over its bound
    Sweep,
    /// Show cache entry count and counters
    Stats,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _guard = match init_logging("logs", "mediastash.log") {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    if let Err(e) = run(args).await {
        e.exit()
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let mut config = EngineConfig::default();
    if let Some(dir) = args.cache_dir {
        config = config.with_cache_dir(dir);
    }
    let engine = CacheEngine::open(config, ReqwestFetcher::new())?;

    match args.command {
        Command::Preload { manifest } => {
            let items = read_manifest(&manifest)?;
            println!("Preloading {} items...", items.len());

            let (tx, mut rx) = mpsc::channel(32);
            let cancel = CancellationToken::new();
            let printer = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    match event {
                        PreloadProgress::Starting { total } => {
                            println!("{total} items to download");
                        }
                        PreloadProgress::Fetched { completed, total, pct } => {
                            println!("[{completed}/{total}] {pct:.1}%");
                        }
                        PreloadProgress::Complete { downloaded, skipped } => {
                            println!("Done: {downloaded} downloaded, {skipped} already cached");
                        }
                        PreloadProgress::Cancelled { completed } => {
                            println!("Cancelled after {completed} items");
                        }
                    }
                }
            });

            let query = PurchaseQuery::default();
            let outcome = tokio::select! {
                outcome = engine.warm(&query, &items, tx, &cancel) => outcome,
                _ = tokio::signal::ctrl_c() => {
                    cancel.cancel();
                    println!("Interrupted");
                    return Ok(());
                }
            };
            let _ = printer.await;
            tracing::info!(?outcome, "preload finished");
        }
        Command::Resolve { url, kind } => {
            let content = ContentRef::new(url, kind.into());
            match engine.resolve(&content) {
                Resolved::Local(path) => println!("local: {}", path.display()),
                Resolved::Remote(url) => println!("remote: {url}"),
            }
        }
        Command::Fetch { url, kind } => {
            let content = ContentRef::new(url.clone(), kind.into());
            match engine.fetch(&content).await {
                Some(path) => println!("cached: {}", path.display()),
                None => println!("download failed, object stays remote: {url}"),
            }
        }
        Command::Sweep => {
            let report = engine.sweep()?;
            println!(
                "{} files examined, {} evicted",
                report.examined, report.deleted
            );
        }
        Command::Stats => {
            let stats = engine.stats();
            println!("entries:          {}", engine.entry_count());
            println!("hits:             {}", stats.hits);
            println!("misses:           {}", stats.misses);
            println!("writes:           {}", stats.writes);
            println!("failed downloads: {}", stats.failed_downloads);
            println!("coalesced:        {}", stats.coalesced);
            println!("collisions:       {}", stats.collisions);
            println!("evictions:        {}", stats.evictions);
        }
    }

    Ok(())
}

fn read_manifest(path: &PathBuf) -> Result<Vec<ContentItem>, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|error| CliError::ManifestRead {
        path: path.display().to_string(),
        error,
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| CliError::Config(format!("invalid manifest {}: {e}", path.display())))
}
