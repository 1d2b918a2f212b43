//! Docsweep main entry point
//!
//! This is the command-line interface for the Docsweep documentation crawler.

use anyhow::Context;
use clap::Parser;
use docsweep::config::{load_config, validate, BasicAuth, CrawlConfig};
use docsweep::crawler::crawl;
use docsweep::output::{print_statistics, write_outputs};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Docsweep: snapshot a documentation site into one Markdown file
///
/// Docsweep crawls every page on the base URL's host while respecting
/// robots.txt and a global rate limit, extracts the main content of each
/// page and writes a single Markdown document with a table of contents,
/// plus a JSON metadata record next to it.
#[derive(Parser, Debug)]
#[command(name = "docsweep")]
#[command(version)]
#[command(about = "Snapshot a documentation site into one Markdown file", long_about = None)]
struct Cli {
    /// Base URL of the documentation site
    #[arg(value_name = "URL")]
    base_url: String,

    /// Markdown output file; metadata is written next to it
    #[arg(short, long, default_value = "output.md")]
    output: PathBuf,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Maximum number of pages to crawl
    #[arg(long)]
    max_pages: Option<usize>,

    /// Minimum content length in characters for a page to be kept
    #[arg(long)]
    min_content_length: Option<usize>,

    /// Directory for the page cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Empty the cache before crawling
    #[arg(long)]
    clear_cache: bool,

    /// Ignore robots.txt (use with care)
    #[arg(long)]
    no_robots: bool,

    /// Abort when no page completes for this many seconds
    #[arg(long, value_name = "SECS")]
    stall_timeout: Option<u64>,

    /// Retries after the first failed attempt
    #[arg(long)]
    retry_limit: Option<u32>,

    /// Minimum spacing between requests in milliseconds
    #[arg(long, value_name = "MS")]
    rate_limit: Option<u64>,

    /// Username for HTTP Basic authentication
    #[arg(long, requires = "auth_pass")]
    auth_user: Option<String>,

    /// Password for HTTP Basic authentication
    #[arg(long, requires = "auth_user")]
    auth_pass: Option<String>,

    /// Custom request header as 'Name: Value' (repeatable)
    #[arg(long = "header", value_name = "HEADER", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Log content extraction details for every page
    #[arg(long)]
    debug: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.debug);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, debug: bool) {
    let verbose = if debug { verbose.max(1) } else { verbose };
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("docsweep=info,warn"),
            1 => EnvFilter::new("docsweep=debug,info"),
            _ => EnvFilter::new("docsweep=trace,debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Parses a `Name: Value` header argument
fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected 'Name: Value', got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{}'", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Builds the run configuration: file (or defaults), then flag overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<CrawlConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => CrawlConfig::default(),
    };

    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(max_pages) = cli.max_pages {
        config.max_pages = max_pages;
    }
    if let Some(min_content_length) = cli.min_content_length {
        config.min_content_length = min_content_length;
    }
    if let Some(cache_dir) = &cli.cache_dir {
        config.cache_dir = cache_dir.clone();
    }
    if let Some(stall_timeout) = cli.stall_timeout {
        config.stall_timeout_secs = stall_timeout;
    }
    if let Some(retry_limit) = cli.retry_limit {
        config.retry_limit = retry_limit;
    }
    if let Some(rate_limit) = cli.rate_limit {
        config.rate_limit_interval_ms = rate_limit;
    }
    if let (Some(username), Some(password)) = (&cli.auth_user, &cli.auth_pass) {
        config.auth = Some(BasicAuth {
            username: username.clone(),
            password: password.clone(),
        });
    }
    config.headers.extend(cli.headers.iter().cloned());
    config.clear_cache_first |= cli.clear_cache;
    config.respect_robots &= !cli.no_robots;
    config.debug |= cli.debug;

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Runs the crawl and writes its outputs, returning the process exit code
async fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = resolve_config(&cli)?;

    if !config.respect_robots {
        tracing::warn!("robots.txt will be ignored");
    }

    let report = crawl(&cli.base_url, config)
        .await
        .with_context(|| format!("Crawl of {} failed", cli.base_url))?;

    // Aborted runs still flush what they collected
    write_outputs(&report.markdown, &report.metadata(), &cli.output)
        .await
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    if !cli.quiet {
        println!();
        print_statistics(&report.stats);
        println!();
        println!("Outcome: {}", report.outcome);
        if !report.warnings.is_empty() {
            println!("Warnings:");
            for warning in &report.warnings {
                println!("  - {}", warning);
            }
        }
        println!("Output: {}", cli.output.display());
    }

    Ok(report.outcome.exit_code())
}
