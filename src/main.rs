//! clipsave: watch the clipboard and save new images as timestamped PNGs
//!
//! Runs until Ctrl+C. Logging goes to stderr and respects `RUST_LOG`; the
//! banner and per-save lines go to stdout.
//!
//! `clipsave fill <FILE>` writes new clipboard images to the missing image
//! targets of a markdown document instead, and exits once all are filled.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clipsave::{
    clipboard::create_default_reader,
    error::{ClipboardError, PersistError},
    markdown::{PlaceholderSink, document_dir},
    model::{WatcherConfig, default_target_dir},
    persist::{ImagePersister, list_saved},
    watcher::Watcher,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "clipsave", version)]
#[command(about = "Watch the clipboard and save every new image as a timestamped PNG")]
struct Cli {
    #[command(flatten)]
    watch: WatchArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct WatchArgs {
    /// Directory to save images into; must already exist [default: Downloads]
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Delay between clipboard polls, in milliseconds
    #[arg(long, default_value_t = 500, global = true)]
    interval_ms: u64,

    /// Upper bound for one clipboard query, in seconds
    #[arg(long, default_value_t = 5, global = true)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// List previously saved images, newest first
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Fill missing image targets of a markdown file, in document order
    Fill {
        /// Markdown document whose `![alt](path.png)` targets should be filled
        markdown: PathBuf,

        /// Use the image already on the clipboard for the first target
        #[arg(long)]
        include_current: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is reserved for the banner and save lines
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clipsave=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let dir = cli.watch.dir.clone().unwrap_or_else(default_target_dir);

    match cli.command {
        Some(Commands::List { json }) => list(&dir, json),
        Some(Commands::Fill {
            markdown,
            include_current,
        }) => {
            let config = cli.watch.config(document_dir(&markdown));
            fill(&markdown, config, include_current).await
        }
        None => watch(cli.watch.config(dir)).await,
    }
}

impl WatchArgs {
    fn config(&self, target_dir: impl Into<PathBuf>) -> WatcherConfig {
        WatcherConfig::new(target_dir)
            .with_interval(Duration::from_millis(self.interval_ms))
            .with_read_timeout(Duration::from_secs(self.timeout_secs))
    }
}

async fn watch(config: WatcherConfig) -> Result<()> {
    config.validate()?;

    let persister = ImagePersister::new(config.target_dir()).map_err(persist_failure)?;
    let reader = create_default_reader(config.read_timeout).map_err(clipboard_failure)?;
    info!(reader = %reader.reader_type(), "Clipboard reader ready");

    println!("Monitoring clipboard for images...");
    println!("Saving to: {}", config.target_dir().display());
    println!("Press Ctrl+C to stop.\n");

    let mut watcher = Watcher::new(reader, persister, config.interval);
    let summary = watcher
        .run_until(shutdown_signal(), |saved| println!("Saved: {}", saved.filename))
        .await
        .map_err(persist_failure)
        .context("Clipboard watcher stopped")?;

    info!(polls = summary.polls, saves = summary.saves, "Clean shutdown");
    println!("\nStopped.");
    Ok(())
}

async fn fill(markdown: &Path, config: WatcherConfig, include_current: bool) -> Result<()> {
    config.validate()?;

    let sink = PlaceholderSink::open(markdown).map_err(persist_failure)?;
    if sink.remaining() == 0 {
        anyhow::bail!("No unfilled PNG image placeholders in {}", markdown.display());
    }
    let reader = create_default_reader(config.read_timeout).map_err(clipboard_failure)?;

    println!("Filling {} image placeholders in {}:", sink.remaining(), markdown.display());
    for placeholder in sink.pending() {
        println!("  line {:>4}  {}", placeholder.line, placeholder.target);
    }
    println!("\nCopy images in order; each new one fills the next placeholder.");
    println!("Press Ctrl+C to stop.\n");

    let mut watcher = Watcher::new(reader, sink, config.interval);
    if !include_current && watcher.ignore_current_image().await {
        info!("Waiting for a new image; the current clipboard image is ignored");
    }

    watcher
        .run_until(shutdown_signal(), |saved| println!("Saved: {}", saved.path.display()))
        .await
        .map_err(persist_failure)
        .context("Placeholder fill stopped")?;

    match watcher.sink().remaining() {
        0 => println!("\nAll placeholders filled."),
        remaining => println!("\nStopped. {} placeholders remaining.", remaining),
    }
    Ok(())
}

fn list(dir: &Path, json: bool) -> Result<()> {
    let files = list_saved(dir).map_err(persist_failure)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!("No saved images in {}", dir.display());
        return Ok(());
    }

    println!("Found {} images in {}:\n", files.len(), dir.display());
    for file in files {
        println!("  {}  {}x{}", file.filename, file.width, file.height);
    }

    Ok(())
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn persist_failure(error: PersistError) -> anyhow::Error {
    eprintln!("Hint: {}", error.remediation_hint());
    error.into()
}

fn clipboard_failure(error: ClipboardError) -> anyhow::Error {
    eprintln!("Hint: {}", error.remediation_hint());
    error.into()
}
