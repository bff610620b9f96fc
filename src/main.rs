//! Jobtrawl main entry point
//!
//! This is the command-line interface for the jobtrawl job-listing crawler.

use clap::Parser;
use jobtrawl::browser::launcher_for;
use jobtrawl::config::{load_config, validate, Config};
use jobtrawl::ConfigError;
use jobtrawl::crawler::scrape_all;
use jobtrawl::output::{generate_markdown_digest, print_statistics, RunStatistics};
use jobtrawl::storage::{open_store, JobFilter, JobStore};
use jobtrawl::{JobSource, SearchRequest, SourceAdapter};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Jobtrawl: a concurrent job-listing crawler
///
/// Jobtrawl searches job sites for every title and location pair, deduplicates
/// the listings it finds, reads each listing's full description and stores the
/// results in SQLite.
#[derive(Parser, Debug)]
#[command(name = "jobtrawl")]
#[command(version)]
#[command(about = "A concurrent job-listing crawler", long_about = None)]
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

    /// Only run (or list) these sources
    #[arg(long = "source", value_name = "NAME")]
    sources: Vec<String>,

    /// Replace the configured job titles
    #[arg(long = "title", value_name = "TITLE")]
    titles: Vec<String>,

    /// Replace the configured locations
    #[arg(long = "location", value_name = "LOCATION")]
    locations: Vec<String>,

    /// Only search for remote jobs
    #[arg(long)]
    remote: bool,

    /// Maximum number of jobs per source
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    limit: Option<u64>,

    /// Validate config and show the query plan without crawling
    #[arg(long, conflicts_with = "list")]
    dry_run: bool,

    /// Show jobs already stored in the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Login credentials may live in a .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config(&cli.config) {
        Ok(cfg) => {
            tracing::info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    if let Err(e) = apply_overrides(&mut config, &cli) {
        tracing::error!("Invalid command-line override: {}", e);
        return Err(e.into());
    }

    // Handle different modes
    if cli.list {
        handle_list(&config, &cli)?;
    } else {
        let adapters = config.adapters()?;
        if cli.dry_run {
            handle_dry_run(&config, &adapters)?;
        } else {
            handle_crawl(&config, adapters).await?;
        }
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
            0 => EnvFilter::new("jobtrawl=info,warn"),
            1 => EnvFilter::new("jobtrawl=debug,info"),
            2 => EnvFilter::new("jobtrawl=trace,debug"),
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

/// Applies command-line overrides on top of the loaded configuration and
/// validates the result again
fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<(), ConfigError> {
    if !cli.sources.is_empty() {
        config.sources = cli.sources.clone();
    }
    if !cli.titles.is_empty() {
        config.search.titles = cli.titles.clone();
    }
    if !cli.locations.is_empty() {
        config.search.locations = cli.locations.clone();
    }
    if cli.remote {
        config.search.remote_only = true;
    }
    if let Some(limit) = cli.limit {
        config.search.limit = Some(limit as usize);
    }
    validate(config)
}

/// Handles the --dry-run mode: shows every search URL and its quota
fn handle_dry_run(
    config: &Config,
    adapters: &[SourceAdapter],
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Jobtrawl Dry Run ===\n");

    let request = SearchRequest::from(&config.search);
    let quota = config
        .crawler
        .query_quota(request.limit, request.titles.len());

    println!("Crawler Configuration:");
    println!("  Detail workers: {}", config.crawler.workers);
    println!("  Driver: {:?}", config.browser.driver);
    println!("  Per-query quota: {}", quota);
    match request.limit {
        Some(limit) => println!("  Limit per source: {}", limit),
        None => println!("  Limit per source: none"),
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(summary) = &config.output.summary_path {
        println!("  Digest: {}", summary);
    }

    let queries = request.queries();
    for adapter in adapters {
        println!("\n{} ({} queries):", adapter.name, queries.len());
        if adapter.login.is_some() {
            println!("  Login procedure: yes");
        }
        for query in &queries {
            let url = adapter.build_search_url(&query.title, &query.location, request.remote_only)?;
            println!("  - {}: {}", query, url);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would run {} queries across {} sources",
        queries.len() * adapters.len(),
        adapters.len()
    );

    Ok(())
}

/// Handles the --list mode: shows jobs already stored in the database
fn handle_list(config: &Config, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))?;
    let sources: Vec<Option<JobSource>> = if cli.sources.is_empty() {
        vec![None]
    } else {
        cli.sources
            .iter()
            .map(|name| Some(JobSource::from_name(name)))
            .collect()
    };

    let mut total = 0;
    for source in sources {
        let filter = JobFilter {
            source,
            title_contains: cli.titles.first().cloned(),
            limit: cli.limit.map(|l| l as usize),
        };
        for job in store.get_jobs(&filter)? {
            total += 1;
            println!("[{}] {} @ {} ({})", job.source, job.title, job.company, job.location);
            println!("    {}", job.url);
        }
    }

    println!("\n{} of {} stored jobs shown", total, store.count_jobs()?);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    adapters: Vec<SourceAdapter>,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = SearchRequest::from(&config.search);
    tracing::info!(
        "Sources: {}, titles: {}, locations: {}",
        adapters.len(),
        request.titles.len(),
        request.locations.len()
    );

    let launcher = launcher_for(&config.browser)?;
    let outcomes = scrape_all(adapters, launcher, &config.crawler, &request).await;

    let mut stats = RunStatistics::from_outcomes(&outcomes);
    let jobs: Vec<_> = outcomes
        .into_iter()
        .filter_map(|outcome| outcome.result.ok())
        .flat_map(|output| output.records)
        .collect();

    let mut store = open_store(Path::new(&config.output.database_path))?;
    let saved = store.save_jobs(&jobs)?;
    tracing::info!("Saved {} jobs to {}", saved, config.output.database_path);
    stats.saved = Some(saved);

    print_statistics(&stats);

    if let Some(summary_path) = &config.output.summary_path {
        generate_markdown_digest(&jobs, &stats, Path::new(summary_path))?;
        println!("✓ Digest written to: {}", summary_path);
    }

    if stats.failed_sources() == stats.sources.len() && !stats.sources.is_empty() {
        tracing::error!("Every source failed");
    } else {
        tracing::info!("Crawl completed");
    }

    Ok(())
}
