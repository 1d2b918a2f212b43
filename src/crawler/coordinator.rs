//! Crawler coordinator - run orchestration
//!
//! This module wires every component of a run together:
//! - Opening (and optionally clearing) the page cache
//! - Building the HTTP client, rate limiter, robots gate and fetcher
//! - Seeding the frontier with the base URL
//! - Running the worker pool, the collector and the stall watcher
//! - Assembling, rendering and validating the document

use crate::cache::PageCache;
use crate::config::{validate, validate_base_url, CrawlConfig};
use crate::crawler::collector::spawn_collector;
use crate::crawler::fetcher::{build_http_client, Fetcher, RetryPolicy};
use crate::crawler::frontier::Frontier;
use crate::crawler::monitor::{
    spawn_interrupt_listener, spawn_stall_watcher, AbortReason, ProgressClock, Shutdown,
};
use crate::crawler::rate_limit::RateLimiter;
use crate::crawler::worker::{run_worker, WorkerContext};
use crate::extract::{ExtractOptions, SpaReport};
use crate::output::{
    render_markdown, validate_output, Assembler, ConfigSummary, CrawlStats, Document,
    RunMetadata,
};
use crate::robots::RobotsGate;
use crate::url::{normalize_parsed, DomainScope};
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use url::Url;

/// How a run ended
#[derive(Debug, Clone)]
pub enum CrawlOutcome {
    /// The frontier was exhausted or the page budget reached
    Completed,

    /// The site renders its content client-side
    SpaAborted(SpaReport),

    /// No progress within the stall timeout
    Stalled {
        idle: Duration,
        in_flight: Vec<String>,
    },

    /// Stopped by the user
    Interrupted,
}

impl CrawlOutcome {
    fn from_reason(reason: Option<AbortReason>) -> Self {
        match reason {
            None => Self::Completed,
            Some(AbortReason::Spa(report)) => Self::SpaAborted(report),
            Some(AbortReason::Stall { idle, in_flight }) => Self::Stalled { idle, in_flight },
            Some(AbortReason::Interrupted) => Self::Interrupted,
        }
    }

    /// Process exit code for the outcome
    ///
    /// | Outcome | Code |
    /// |---------|------|
    /// | Completed | 0 |
    /// | SpaAborted | 2 |
    /// | Stalled | 3 |
    /// | Interrupted | 130 |
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::SpaAborted(_) => 2,
            Self::Stalled { .. } => 3,
            Self::Interrupted => 130,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::SpaAborted(_) => "spa-aborted",
            Self::Stalled { .. } => "stalled",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::SpaAborted(report) => {
                write!(f, "aborted: {}", AbortReason::Spa(report.clone()))
            }
            Self::Stalled { idle, in_flight } => write!(
                f,
                "aborted: {}",
                AbortReason::Stall {
                    idle: *idle,
                    in_flight: in_flight.clone(),
                }
            ),
            Self::Interrupted => write!(f, "aborted: {}", AbortReason::Interrupted),
        }
    }
}

/// Everything a finished run produced
///
/// Aborted runs carry the pages completed before the abort.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub base_url: String,
    pub document: Document,
    pub markdown: String,
    pub stats: CrawlStats,
    pub outcome: CrawlOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub warnings: Vec<String>,
    pub config: Arc<CrawlConfig>,
}

impl CrawlReport {
    /// Metadata record for the run
    pub fn metadata(&self) -> RunMetadata {
        RunMetadata {
            version: crate::VERSION.to_string(),
            base_url: self.base_url.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            outcome: self.outcome.as_str().to_string(),
            config: ConfigSummary::from(self.config.as_ref()),
            stats: self.stats.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

/// One crawl run over a documentation site
pub struct Crawler {
    base_url: Url,
    config: Arc<CrawlConfig>,
    shutdown: Shutdown,
}

impl Crawler {
    /// Validates the configuration and the base URL
    ///
    /// # Arguments
    ///
    /// * `base_url` - Start page; its host bounds the crawl
    /// * `config` - The resolved crawl configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(DocsweepError)` - Invalid configuration or base URL
    pub fn new(base_url: &str, config: CrawlConfig) -> Result<Self> {
        validate(&config)?;
        let base_url = normalize_parsed(validate_base_url(base_url)?)?;

        Ok(Self {
            base_url,
            config: Arc::new(config),
            shutdown: Shutdown::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Handle for aborting the run from outside, e.g. on Ctrl-C
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Runs the crawl to completion or abort
    ///
    /// Per-page failures never fail the run; only setup errors (cache
    /// directory, HTTP client) are returned as `Err`.
    pub async fn run(self) -> Result<CrawlReport> {
        let started_at = Utc::now();
        let config = Arc::clone(&self.config);
        info!(
            "Starting crawl of {} with {} worker(s), page budget {}",
            self.base_url, config.workers, config.max_pages
        );

        let cache = PageCache::open(&config.cache_dir).await?;
        if config.clear_cache_first {
            let removed = cache.clear().await?;
            info!("Cleared {} cached page(s) from {}", removed, cache.dir().display());
        }

        let client = build_http_client(&config)?;
        let limiter = Arc::new(RateLimiter::new(config.rate_limit_interval()));
        let robots = Arc::new(RobotsGate::new(
            client.clone(),
            config.robots_agent(),
            config.respect_robots,
            Arc::clone(&limiter),
        ));
        let fetcher = Arc::new(Fetcher::new(
            client,
            config.auth.clone(),
            Arc::clone(&limiter),
            RetryPolicy::from_config(&config),
        ));

        let scope = DomainScope::new(&self.base_url)?;
        let frontier = Arc::new(Frontier::new(
            scope,
            config.max_pages,
            self.shutdown.token(),
        ));
        frontier.enqueue(&self.base_url, 0, None);

        let clock = Arc::new(ProgressClock::new());
        let (events, collector) = spawn_collector(
            Assembler::new(self.base_url.as_str(), config.toc_depth),
            Arc::clone(&frontier),
        );
        let stall_watcher = spawn_stall_watcher(
            Arc::clone(&clock),
            Arc::clone(&frontier),
            limiter,
            config.stall_timeout(),
            self.shutdown.clone(),
        );

        let ctx = Arc::new(WorkerContext {
            frontier: Arc::clone(&frontier),
            robots,
            cache: Arc::new(cache),
            fetcher,
            events,
            clock,
            shutdown: self.shutdown.clone(),
            extract_options: ExtractOptions::from_config(&config),
            spa_probe_pages: config.spa.probe_pages,
        });

        let mut workers = JoinSet::new();
        for id in 0..config.workers {
            workers.spawn(run_worker(id, Arc::clone(&ctx)));
        }
        drop(ctx);

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                error!("Worker task failed: {}", e);
                frontier.close();
            }
        }
        frontier.close();
        stall_watcher.abort();

        let (mut stats, assembler) = collector
            .await
            .map_err(|e| crate::DocsweepError::Worker(e.to_string()))?;

        let leftover = frontier.drain_pending();
        if leftover > 0 {
            info!("{} queued page(s) abandoned", leftover);
            stats.abandoned += leftover as u64;
        }

        let outcome = CrawlOutcome::from_reason(self.shutdown.reason());
        match &outcome {
            CrawlOutcome::Completed => info!("Crawl completed"),
            other => error!("Crawl {}", other),
        }

        let document = assembler.assemble(&mut stats);
        let markdown = render_markdown(&document, &stats);
        let warnings = validate_output(markdown.len() as u64, &stats);
        for warning in &warnings {
            warn!("Validation: {}", warning);
        }

        let finished_at = Utc::now();
        info!(
            "{} page(s) included ({} fetched, {} from cache, {} failed) in {:.1}s",
            stats.pages_included,
            stats.fetched,
            stats.cache_hits,
            stats.failed,
            (finished_at - started_at).num_milliseconds() as f64 / 1000.0
        );

        Ok(CrawlReport {
            base_url: self.base_url.to_string(),
            document,
            markdown,
            stats,
            outcome,
            started_at,
            finished_at,
            warnings,
            config,
        })
    }
}

/// Runs a complete crawl with Ctrl-C handling
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the configuration and base URL
/// 2. Install an interrupt listener that aborts the run gracefully
/// 3. Crawl until completion or abort
/// 4. Return the assembled report, partial if the run was aborted
pub async fn crawl(base_url: &str, config: CrawlConfig) -> Result<CrawlReport> {
    let crawler = Crawler::new(base_url, config)?;
    let listener = spawn_interrupt_listener(crawler.shutdown_handle());

    let report = crawler.run().await;
    listener.abort();
    report
}
