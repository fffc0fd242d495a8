//! Tutorial-Vault main entry point
//!
//! This is the command-line interface for the Tutorial-Vault archiver.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tutorial_vault::browser::{BrowserSession, ConnectionMode, PageFetcher};
use tutorial_vault::config::{load_config_or_default, validate, Config};
use tutorial_vault::layout::VaultLayout;
use tutorial_vault::{Crawler, JsonProgressStore, ProgressStore};
use tracing_subscriber::EnvFilter;

/// Tutorial-Vault: an offline archiver for guide/tutorial sites
///
/// Tutorial-Vault drives a browser through every guide and tutorial of the
/// site, and writes a cross-linked Markdown vault with local copies of the
/// media. Interrupted runs resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "tutorial-vault")]
#[command(version = "1.0.0")]
#[command(about = "Archive guides and tutorials into a Markdown vault", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discard saved progress and start over
    #[arg(long)]
    fresh: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with_all = ["stats", "rebuild_indexes", "export_cookies"])]
    dry_run: bool,

    /// Show progress statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "rebuild_indexes", "export_cookies"])]
    stats: bool,

    /// Regenerate standalone and topic indexes from the vault and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "export_cookies"])]
    rebuild_indexes: bool,

    /// Start a browser session, write its cookies to FILE and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["dry_run", "stats", "rebuild_indexes"])]
    export_cookies: Option<PathBuf>,

    /// Vault directory (overrides config)
    #[arg(long, value_name = "DIR")]
    vault_dir: Option<PathBuf>,

    /// Delay between pages in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    delay: Option<u64>,

    /// Site base URL (overrides config)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Cookie export to load into a disposable browser
    #[arg(long, value_name = "FILE")]
    cookies_file: Option<PathBuf>,

    /// Attach to a running browser's debugging endpoint
    #[arg(long, value_name = "URL", conflicts_with = "profile_dir")]
    cdp_url: Option<String>,

    /// Launch the browser with an existing profile directory
    #[arg(long, value_name = "DIR")]
    profile_dir: Option<PathBuf>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_effective_config(&cli)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config);
    } else if cli.rebuild_indexes {
        handle_rebuild_indexes(&config)?;
    } else if let Some(path) = &cli.export_cookies {
        handle_export_cookies(&config, path).await?;
    } else {
        handle_crawl(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tutorial_vault=info,warn"),
            1 => EnvFilter::new("tutorial_vault=debug,info"),
            2 => EnvFilter::new("tutorial_vault=trace,debug"),
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

/// Loads the config file (or defaults) and applies command-line overrides
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::info!("No configuration file given, using defaults"),
    }
    let mut config = load_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(dir) = &cli.vault_dir {
        config.output.vault_dir = dir.clone();
    }
    if let Some(delay) = cli.delay {
        config.crawler.delay_ms = delay;
    }
    if let Some(base_url) = &cli.base_url {
        config.site.base_url = base_url.clone();
    }
    if let Some(file) = &cli.cookies_file {
        config.browser.cookies_file = Some(file.clone());
    }
    if let Some(endpoint) = &cli.cdp_url {
        config.browser.cdp_url = Some(endpoint.clone());
        config.browser.profile_dir = None;
    }
    if let Some(dir) = &cli.profile_dir {
        config.browser.profile_dir = Some(dir.clone());
        config.browser.cdp_url = None;
    }
    if cli.headed {
        config.browser.headless = false;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

fn layout_for(config: &Config) -> VaultLayout {
    VaultLayout::new(
        config.output.vault_dir.clone(),
        config.output.max_filename_length,
    )
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Tutorial-Vault Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Guide listing: {}", config.site.guide_listing_path);
    println!("  Tutorial listing: {}", config.site.tutorial_listing_path);

    println!("\nCrawler:");
    println!("  Delay: {}ms", config.crawler.delay_ms);
    println!(
        "  Navigation timeout: {}s",
        config.crawler.navigation_timeout_secs
    );
    println!("  Wait until: {:?}", config.crawler.wait_until);
    println!("  Standalone pass: {}", config.crawler.scrape_standalone);

    println!("\nBrowser:");
    match ConnectionMode::from_config(&config.browser) {
        ConnectionMode::Attach { endpoint } => println!("  Mode: attach to {}", endpoint),
        ConnectionMode::Profile { dir } => println!("  Mode: profile {}", dir.display()),
        ConnectionMode::Disposable => {
            println!("  Mode: disposable (headless: {})", config.browser.headless);
            if let Some(file) = &config.browser.cookies_file {
                println!("  Cookies: {}", file.display());
            }
        }
    }

    println!("\nDownloader:");
    println!("  Max concurrent: {}", config.downloader.max_concurrent);
    println!("  Timeout: {}s", config.downloader.timeout_secs);

    println!("\nOutput:");
    println!("  Vault: {}", config.output.vault_dir.display());
    println!("  Progress: {}", layout_for(config).progress_path().display());

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows counts from the progress file
fn handle_stats(config: &Config) {
    let store = JsonProgressStore::new(layout_for(config).progress_path());
    let state = store.snapshot();

    println!("Progress: {}\n", store.path().display());
    println!("Completed guides:    {}", state.completed_guides.len());
    println!("Completed tutorials: {}", state.completed_tutorials.len());
    println!("Failed tutorials:    {}", state.failed_tutorials.len());

    for failed in &state.failed_tutorials {
        println!("  - {}: {}", failed.url, failed.error);
    }
}

/// Handles the --rebuild-indexes mode
fn handle_rebuild_indexes(config: &Config) -> anyhow::Result<()> {
    let layout = layout_for(config);
    let standalone = layout.rebuild_standalone_index()?;
    let topics = layout.rebuild_topic_indexes()?;

    println!(
        "✓ Rebuilt standalone index ({} tutorials) and {} topic indexes",
        standalone, topics
    );
    Ok(())
}

/// Handles the --export-cookies mode
async fn handle_export_cookies(config: &Config, path: &std::path::Path) -> anyhow::Result<()> {
    let mut session = BrowserSession::start(&config.browser, &config.site.interstitial_text)
        .await
        .context("Failed to start browser session")?;

    let result = session.export_cookies(path).await;
    session.close().await?;

    let count = result?;
    println!("✓ Exported {} cookies to {}", count, path.display());
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    let layout = layout_for(&config);
    if fresh {
        tracing::info!("Starting fresh crawl (discarding saved progress)");
        JsonProgressStore::new(layout.progress_path()).reset()?;
    } else {
        tracing::info!("Starting crawl (completed work will be skipped)");
    }

    let session = BrowserSession::start(&config.browser, &config.site.interstitial_text)
        .await
        .context("Failed to start browser session")?;
    tracing::info!("Browser session started ({:?})", session.mode());

    let mut crawler = Crawler::new(config, session)?;

    let stop = crawler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current unit of work");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let result = crawler.run().await;
    if let Err(e) = crawler.shutdown().await {
        tracing::warn!("Failed to close browser session: {}", e);
    }

    match result {
        Ok(summary) if summary.interrupted => {
            tracing::info!("Crawl interrupted; progress saved ({})", summary);
            Ok(())
        }
        Ok(summary) => {
            tracing::info!("Crawl completed successfully ({})", summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
