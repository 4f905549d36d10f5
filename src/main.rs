//! Sumi-Harvest main entry point
//!
//! Command-line driver that crawls from one seed with the bundled page spider.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_harvest::config::{load_config_with_hash, Config};
use sumi_harvest::crawler::{Crawler, HttpFetcher, RequestSpec, Spider};
use sumi_harvest::output::{generate_markdown_summary, print_summary, RunInfo};
use sumi_harvest::pipeline::{LogItems, Pipeline};
use sumi_harvest::spiders::PageSpider;
use sumi_harvest::SumiError;
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a pluggable crawl engine
///
/// Crawls outward from a seed URL, recording the title and links of every
/// HTML page it reaches. Press Ctrl-C to stop dispatching new requests; work
/// already in flight finishes and the summary is still written.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version)]
#[command(about = "A pluggable crawl engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URL the crawl starts from
    #[arg(value_name = "SEED")]
    seed: String,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and seed, then exit without crawling
    #[arg(long)]
    dry_run: bool,

    /// Record pages without following their links
    #[arg(long)]
    no_follow: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let seed = RequestSpec::new(&cli.seed).map_err(|source| SumiError::InvalidSeed {
        url: cli.seed.clone(),
        source,
    })?;

    if cli.dry_run {
        handle_dry_run(&config, &seed);
        return Ok(());
    }

    let spider = PageSpider::new().follow_links(!cli.no_follow);
    let info = RunInfo {
        seed: seed.to_string(),
        spider: spider.name().to_string(),
        config_hash: Some(config_hash),
    };

    let fetcher = HttpFetcher::new(&config).context("Failed to build HTTP client")?;
    let pipeline = Pipeline::new().with_stage(LogItems);
    let mut crawler = Crawler::new(config.crawler.clone(), fetcher, spider, pipeline)?;

    let cancel = crawler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight requests");
            cancel.cancel();
        }
    });

    let summary = crawler.run(seed).await?;

    if !cli.quiet {
        println!();
        print_summary(&summary);
    }

    if let Some(path) = &config.output.summary_path {
        generate_markdown_summary(&summary, &info, Path::new(path))
            .with_context(|| format!("Failed to write summary to {}", path))?;
        tracing::info!("Summary written to: {}", path);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective settings
fn handle_dry_run(config: &Config, seed: &RequestSpec) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Seed: {}", seed);

    println!("\nCrawler Configuration:");
    println!("  Total concurrency: {}", config.crawler.total_concurrency);
    println!("  Per-host concurrency: {}", config.crawler.per_host_concurrency);
    println!("  Frontier ordering: {:?}", config.crawler.frontier_ordering);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!(
        "  Back-off: {}ms base, {}ms cap",
        config.crawler.backoff_base, config.crawler.backoff_cap
    );
    println!("  Request timeout: {}ms", config.crawler.request_timeout);
    match config.crawler.max_depth {
        Some(depth) => println!("  Max depth: {}", depth),
        None => println!("  Max depth: unlimited"),
    }
    match config.crawler.max_requests {
        Some(requests) => println!("  Max requests: {}", requests),
        None => println!("  Max requests: unlimited"),
    }

    if config.crawler.allowed_domains.is_empty() {
        println!("\nAllowed Domains: any");
    } else {
        println!("\nAllowed Domains ({}):", config.crawler.allowed_domains.len());
        for pattern in &config.crawler.allowed_domains {
            println!("  - {}", pattern);
        }
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    match &config.output.summary_path {
        Some(path) => println!("  Summary: {}", path),
        None => println!("  Summary: not written"),
    }

    println!("\n✓ Configuration is valid");
}
