//! Per-task pipeline run by every worker
//!
//! Junk path check, robots gate, cache lookup, fetch with retries, cache
//! write, extraction, link admission and result handoff. Each task is
//! disposed of exactly once: included, filtered, blocked, failed or
//! abandoned.

use crate::cache::PageCache;
use crate::crawler::collector::EventSender;
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::frontier::{Admission, Frontier, UrlTask};
use crate::crawler::monitor::{AbortReason, ProgressClock, Shutdown};
use crate::extract::{extract, is_junk_path, ExtractOptions, Extracted, PageOutcome};
use crate::output::StatEvent;
use crate::robots::RobotsGate;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Everything a worker shares with the rest of the run
pub struct WorkerContext {
    pub frontier: Arc<Frontier>,
    pub robots: Arc<RobotsGate>,
    pub cache: Arc<PageCache>,
    pub fetcher: Arc<Fetcher>,
    pub events: EventSender,
    pub clock: Arc<ProgressClock>,
    pub shutdown: Shutdown,
    pub extract_options: ExtractOptions,
    /// Tasks with a lower discovery sequence are SPA-probed
    pub spa_probe_pages: u64,
}

/// Pulls tasks until the frontier closes
pub async fn run_worker(id: usize, ctx: Arc<WorkerContext>) {
    debug!("Worker {} started", id);

    while let Some(task) = ctx.frontier.next().await {
        debug!("Worker {} processing #{} {}", id, task.seq, task.url);
        ctx.process(&task).await;
        ctx.frontier.complete(&task);
    }

    debug!("Worker {} finished", id);
}

/// Raw HTML of a page and the URL it was served from
struct Retrieved {
    html: String,
    final_url: Url,
}

impl WorkerContext {
    async fn process(&self, task: &UrlTask) {
        if is_junk_path(&task.url) {
            info!("Skipping junk page {}", task.url);
            self.events.stat(StatEvent::JunkFiltered);
            return;
        }

        let token = self.shutdown.token();
        match self.robots.allowed(&task.url, &token).await {
            Ok(true) => {}
            Ok(false) => {
                info!("URL {} disallowed by robots.txt", task.url);
                self.events.stat(StatEvent::BlockedByRobots);
                return;
            }
            Err(_) => {
                debug!("Abandoning {} during robots.txt check", task.url);
                self.events.stat(StatEvent::Abandoned);
                return;
            }
        }

        let Some(retrieved) = self.retrieve(task).await else {
            return;
        };

        self.handle_page(task, retrieved);
    }

    /// Serves a page from the cache or the network
    ///
    /// Returns `None` when the page has been counted as failed or abandoned.
    async fn retrieve(&self, task: &UrlTask) -> Option<Retrieved> {
        if let Some(cached) = self.cache.get(&task.url).await {
            debug!("Cache hit for {}", task.url);
            self.events.stat(StatEvent::CacheHit);
            let final_url = Url::parse(&cached.entry.final_url).unwrap_or_else(|_| task.url.clone());
            return Some(Retrieved {
                html: cached.html,
                final_url,
            });
        }

        let token = self.shutdown.token();
        match self.fetcher.fetch(&task.url, &token).await {
            Ok(fetched) => {
                info!("Fetched {} ({} bytes)", task.url, fetched.body.len());
                self.events.stat(StatEvent::Fetched);
                if fetched.attempts > 1 {
                    self.events.stat(StatEvent::Retries(fetched.attempts - 1));
                }

                if let Err(e) = self
                    .cache
                    .put(&task.url, &fetched.final_url, &fetched.body)
                    .await
                {
                    warn!("Failed to cache {}: {}", task.url, e);
                }

                Some(Retrieved {
                    html: fetched.body,
                    final_url: fetched.final_url,
                })
            }
            Err(failure) => {
                if failure.attempts > 1 {
                    self.events.stat(StatEvent::Retries(failure.attempts - 1));
                }

                if failure.error == FetchError::Cancelled {
                    debug!("Abandoning {} after cancellation", task.url);
                    self.events.stat(StatEvent::Abandoned);
                } else {
                    warn!(
                        "Failed to fetch {} after {} attempt(s): {}",
                        task.url, failure.attempts, failure.error
                    );
                    self.events.stat(StatEvent::Failed);
                    self.clock.tick();
                }
                None
            }
        }
    }

    fn handle_page(&self, task: &UrlTask, retrieved: Retrieved) {
        let options = self
            .extract_options
            .clone()
            .with_spa_probe(task.seq < self.spa_probe_pages);

        let extraction = match extract(&retrieved.html, &retrieved.final_url, &options) {
            Extracted::Spa(report) => {
                error!(
                    "{} looks like a single-page application ({} of 5 indicators: {}); aborting",
                    task.url,
                    report.fired(),
                    report.fired_names().join(", ")
                );
                self.events.stat(StatEvent::SpaDetected);
                self.shutdown.trigger(AbortReason::Spa(report));
                self.frontier.close();
                return;
            }
            Extracted::Page(extraction) => extraction,
        };

        self.admit_links(task, &extraction.links);

        match extraction.outcome {
            PageOutcome::Page(page) => self.events.page(task.seq, page),
            PageOutcome::TooSmall { chars } => {
                info!("Skipping {}: only {} characters of content", task.url, chars);
                self.events.stat(StatEvent::TooSmall);
            }
            PageOutcome::Junk { title } => {
                info!("Skipping junk page {} ({})", task.url, title);
                self.events.stat(StatEvent::JunkFiltered);
            }
        }

        self.clock.tick();
    }

    fn admit_links(&self, task: &UrlTask, links: &[Url]) {
        let (mut external, mut duplicate, mut over_budget) = (0, 0, 0);

        for link in links {
            match self.frontier.enqueue(link, task.depth + 1, Some(&task.url)) {
                Admission::Admitted | Admission::Closed => {}
                Admission::OutOfDomain => external += 1,
                Admission::Duplicate => duplicate += 1,
                Admission::OverBudget => over_budget += 1,
            }
        }

        debug!(
            "{}: {} links ({} external, {} duplicate, {} over budget)",
            task.url,
            links.len(),
            external,
            duplicate,
            over_budget
        );
        self.events.stat(StatEvent::Links {
            found: links.len() as u64,
            external,
            duplicate,
            over_budget,
        });
    }
}
