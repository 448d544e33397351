//! odata-harvest main entry point
//!
//! This is the command-line interface for the odata-harvest crawler.

use anyhow::{bail, Context};
use clap::Parser;
use odata_harvest::cache::FsObjectStore;
use odata_harvest::config::{load_config_with_hash, Config};
use odata_harvest::crawler::{Controller, ControllerSettings};
use odata_harvest::output::{collect, print_collect_report, print_report, JsonLinesSink};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// odata-harvest: a resumable crawler for session-authenticated OData services
///
/// odata-harvest signs in through the service's identity provider, walks the
/// allowed entity collections page by page, and caches every response so an
/// interrupted crawl resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "odata-harvest")]
#[command(version)]
#[command(about = "A resumable crawler for session-authenticated OData services", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Clear the frontier before crawling instead of resuming
    #[arg(long, conflicts_with_all = ["dry_run", "collect"])]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "collect")]
    dry_run: bool,

    /// Write records from every cached page to the records file and exit
    #[arg(long)]
    collect: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.collect {
        handle_collect(&config).await
    } else {
        handle_crawl(&config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("odata_harvest=info,warn"),
            1 => EnvFilter::new("odata_harvest=debug,info"),
            2 => EnvFilter::new("odata_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let settings = ControllerSettings::from_config(config)?;

    println!("=== odata-harvest Dry Run ===\n");

    println!("Service:");
    println!("  Base URL: {}", config.service.base_url);
    println!("  Login URL: {}", config.service.login_url);
    println!("  User agent: {}", config.service.user_agent);
    println!("  Username: {}", config.credentials.username);
    println!("  Allowed domains: {}", settings.scope.patterns().join(", "));

    println!("\nSeeds ({}):", settings.seeds.len());
    for seed in &settings.seeds {
        println!("  - {}", seed);
    }

    println!("\nCollections ({}):", settings.entities.len());
    for entity in &settings.entities {
        println!("  - {}", entity);
    }

    println!("\nCrawler:");
    println!("  Max retries: {}", settings.max_retries);
    println!("  Transient retries: {}", settings.transient_retries);
    println!("  Retry delay: {}ms", settings.retry_delay.as_millis());
    println!("  Max concurrent requests: {}", settings.max_concurrent);
    match settings.crawl_timeout {
        Some(timeout) => println!("  Crawl timeout: {}s", timeout.as_secs()),
        None => println!("  Crawl timeout: none"),
    }
    if config.crawler.auth_redirect_statuses.is_empty() {
        println!("  Session expiry statuses: any 3xx");
    } else {
        println!(
            "  Session expiry statuses: {:?}",
            config.crawler.auth_redirect_statuses
        );
    }

    println!("\nStorage:");
    println!(
        "  Cache: {}/{}",
        config.cache.directory.trim_end_matches('/'),
        config.cache.prefix
    );
    match &config.frontier.database_path {
        Some(path) => println!("  Frontier: {} (set '{}')", path, config.frontier.set_name),
        None => println!("  Frontier: in-memory (not resumable)"),
    }
    match &config.output.records_path {
        Some(path) => println!("  Records: {}", path),
        None => println!("  Records: discarded"),
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling {} seed URL(s) for {} collection(s)",
        settings.seeds.len(),
        settings.entities.len()
    );

    Ok(())
}

/// Handles the --collect mode: replays cached pages into the records file
async fn handle_collect(config: &Config) -> anyhow::Result<()> {
    let Some(records_path) = &config.output.records_path else {
        bail!("--collect needs [output] records-path to be set");
    };

    let store = FsObjectStore::new(&config.cache.directory);
    let sink = JsonLinesSink::create(records_path)
        .await
        .with_context(|| format!("failed to create {}", records_path))?;

    let report = collect(&store, &config.cache.prefix, &sink).await?;
    print_collect_report(&report);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, fresh: bool) -> anyhow::Result<()> {
    let controller = Controller::from_config(config).await?;

    if fresh {
        let cleared = controller.frontier().clear()?;
        tracing::info!("Starting fresh crawl ({} frontier entries cleared)", cleared);
    } else {
        tracing::info!("Starting crawl (resuming from the frontier if it has entries)");
    }

    match controller.run().await {
        Ok(report) => {
            print_report(&report);
            if !report.is_clean() {
                tracing::warn!(
                    "{} request(s) left unfinished; run again to resume them",
                    report.pending
                );
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
