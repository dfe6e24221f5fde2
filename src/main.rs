//! Docatlas main entry point
//!
//! This is the command-line interface for the docatlas documentation crawler.

use anyhow::Context;
use clap::Parser;
use docatlas::config::load_config;
use docatlas::crawler::{CrawlSession, RunOptions};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

/// Docatlas: a resumable documentation-site crawler
///
/// Docatlas crawls a documentation website within a configured scope,
/// extracts structured page records (title, breadcrumbs, excerpt,
/// navigation links), and writes them to a JSON snapshot backed by a
/// crash-safe checkpoint log.
#[derive(Parser, Debug)]
#[command(name = "docatlas")]
#[command(version)]
#[command(about = "A resumable documentation-site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Re-crawl a single URL, replacing its existing record
    #[arg(long, value_name = "URL", conflicts_with = "fresh")]
    url: Option<String>,

    /// Resume an interrupted crawl (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl, ignoring previous state
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    if cli.fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    } else if cli.resume {
        tracing::info!("Resuming interrupted crawl if one exists");
    } else if cli.url.is_none() {
        // Resuming is also the default without the explicit flag
        tracing::info!("Starting crawl (will resume if interrupted run exists)");
    }

    let options = RunOptions {
        fresh: cli.fresh,
        refresh_url: cli.url,
    };

    // Recovery and frontier seeding happen here; failures are fatal
    let session =
        CrawlSession::new(config, options).context("Failed to start crawl session")?;

    // First Ctrl-C stops workers from claiming new items; in-flight
    // fetches finish and get checkpointed before the process exits.
    let shutdown = session.shutdown_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received; finishing in-flight work");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    session.run().await.context("Crawl failed")?;
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("docatlas=info,warn"),
            1 => EnvFilter::new("docatlas=debug,info"),
            2 => EnvFilter::new("docatlas=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
