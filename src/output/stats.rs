//! Crawl statistics
//!
//! Workers never touch the counters directly. They send [`StatEvent`]s to
//! the collector, the single owner of a [`CrawlStats`] value, which applies
//! them in arrival order.

use crate::extract::PageResult;
use serde::{Deserialize, Serialize};

/// Counters of one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlStats {
    /// Pages retrieved over the network
    pub fetched: u64,

    /// Pages whose retries were exhausted or that failed permanently
    pub failed: u64,

    /// Pages served from the cache
    pub cache_hits: u64,

    /// Retry attempts across all pages
    pub retries: u64,

    pub blocked_by_robots: u64,

    /// Junk pages, by path before fetching or by title after extraction
    pub junk_filtered: u64,

    pub too_small: u64,

    /// Links extracted from retrieved pages
    pub links_found: u64,
    pub links_external: u64,
    pub links_duplicate: u64,
    pub links_over_budget: u64,

    pub spa_detected: bool,

    /// Included pages without any title
    pub empty_toc_skipped: u64,

    /// Pages written to the document
    pub pages_included: u64,

    /// Pages dropped because the run was cancelled while they were in flight
    pub abandoned: u64,

    pub total_html_bytes: u64,
    pub total_chars: u64,
    pub total_words: u64,
    pub code_blocks: u64,
}

/// One counter update sent by a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatEvent {
    Fetched,
    CacheHit,
    Failed,
    Retries(u32),
    BlockedByRobots,
    JunkFiltered,
    TooSmall,
    Abandoned,
    Links {
        found: u64,
        external: u64,
        duplicate: u64,
        over_budget: u64,
    },
    SpaDetected,
}

impl CrawlStats {
    pub fn apply(&mut self, event: &StatEvent) {
        match event {
            StatEvent::Fetched => self.fetched += 1,
            StatEvent::CacheHit => self.cache_hits += 1,
            StatEvent::Failed => self.failed += 1,
            StatEvent::Retries(n) => self.retries += u64::from(*n),
            StatEvent::BlockedByRobots => self.blocked_by_robots += 1,
            StatEvent::JunkFiltered => self.junk_filtered += 1,
            StatEvent::TooSmall => self.too_small += 1,
            StatEvent::Abandoned => self.abandoned += 1,
            StatEvent::Links {
                found,
                external,
                duplicate,
                over_budget,
            } => {
                self.links_found += found;
                self.links_external += external;
                self.links_duplicate += duplicate;
                self.links_over_budget += over_budget;
            }
            StatEvent::SpaDetected => self.spa_detected = true,
        }
    }

    /// Adds an included page to the content totals
    pub fn record_page(&mut self, page: &PageResult) {
        self.pages_included += 1;
        self.total_html_bytes += page.html_bytes as u64;
        self.total_chars += page.char_count as u64;
        self.total_words += page.word_count as u64;
        self.code_blocks += page.code_block_count as u64;
    }

    /// Pages whose HTML was retrieved, from the network or the cache
    pub fn retrieved(&self) -> u64 {
        self.fetched + self.cache_hits
    }

    /// Share of retrieval attempts that failed, in `0.0..=1.0`
    pub fn failure_rate(&self) -> f64 {
        let attempted = self.retrieved() + self.failed;
        if attempted == 0 {
            0.0
        } else {
            self.failed as f64 / attempted as f64
        }
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");

    println!("Pages:");
    println!("  Fetched: {}", stats.fetched);
    println!("  Cache hits: {}", stats.cache_hits);
    println!("  Failed: {} ({} retries)", stats.failed, stats.retries);
    println!("  Blocked by robots.txt: {}", stats.blocked_by_robots);
    println!("  Junk filtered: {}", stats.junk_filtered);
    println!("  Too small: {}", stats.too_small);
    if stats.abandoned > 0 {
        println!("  Abandoned: {}", stats.abandoned);
    }
    println!("  Included: {}", stats.pages_included);
    if stats.empty_toc_skipped > 0 {
        println!("  Untitled (TOC skipped): {}", stats.empty_toc_skipped);
    }
    println!();

    println!("Links:");
    println!("  Found: {}", stats.links_found);
    println!("  External: {}", stats.links_external);
    println!("  Duplicate: {}", stats.links_duplicate);
    if stats.links_over_budget > 0 {
        println!("  Over page budget: {}", stats.links_over_budget);
    }
    println!();

    println!("Content:");
    println!("  HTML bytes: {}", stats.total_html_bytes);
    println!("  Characters: {}", stats.total_chars);
    println!("  Words: {}", stats.total_words);
    println!("  Code blocks: {}", stats.code_blocks);
    println!();

    if stats.spa_detected {
        println!("Single-page application detected: content is rendered client-side");
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages retrieved)",
        (1.0 - stats.failure_rate()) * 100.0,
        stats.retrieved(),
        stats.retrieved() + stats.failed
    );
}
