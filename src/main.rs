//! PriceWatch: price and availability tracker for e-commerce pages

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use pricewatch::config::{Config, LogFormat, LoggingConfig};
use pricewatch::tracking::{BrowserPool, PriceExtractor, UrlGuard};

#[derive(Parser)]
#[command(name = "pricewatch")]
#[command(about = "Track prices and availability of products on e-commerce pages")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "pricewatch.toml")]
    config: PathBuf,

    /// Data directory override
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the tracker daemon
    Start,

    /// Check a single URL once and print the extraction result
    Check {
        /// Product page URL
        url: String,

        /// CSS selector hint
        #[arg(short, long)]
        selector: Option<String>,
    },

    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }

    init_tracing(&config.logging, cli.verbose);

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;

    match cli.command {
        Commands::Start => runtime.block_on(pricewatch::daemon::run(config)),
        Commands::Check { url, selector } => {
            runtime.block_on(check_once(config, url, selector))
        }
        Commands::Init { path } => init_config(&path),
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: u8) {
    let level = logging.level.verbose(verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pricewatch={level},info")));

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// One-off check: guard, fetch, extract, print the result as JSON.
async fn check_once(config: Config, url: String, selector: Option<String>) -> Result<()> {
    let guard = UrlGuard::new(config.tracker.effective_allowed_hosts());
    let validated = guard
        .validate(&url)
        .await
        .map_err(|e| anyhow::anyhow!("URL rejected ({}): {e}", e.kind()))?;

    let browser = BrowserPool::new(config.browser.clone());
    let html = browser.fetch(&validated).await?;
    browser.shutdown().await;

    let extractor = Arc::new(PriceExtractor::new());
    let extraction = tokio::task::spawn_blocking(move || {
        extractor.extract(&html, selector.as_deref(), &validated)
    })
    .await?;

    println!("{}", serde_json::to_string_pretty(&extraction)?);
    Ok(())
}

fn init_config(path: &PathBuf) -> Result<()> {
    std::fs::create_dir_all(path)?;
    let target = path.join("pricewatch.toml");
    if target.exists() {
        anyhow::bail!("{} already exists", target.display());
    }
    let config = Config::default();
    std::fs::write(&target, toml::to_string_pretty(&config)?)?;
    println!("Wrote default configuration to {}", target.display());
    Ok(())
}
