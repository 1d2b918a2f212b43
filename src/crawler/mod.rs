//! Crawler module for concurrent page retrieval
//!
//! This module contains the core crawling logic, including:
//! - The deduplicating FIFO frontier
//! - HTTP fetching with retry logic and a global rate limit
//! - The per-task worker pipeline
//! - Stall and interrupt monitoring with cooperative shutdown
//! - Overall crawl coordination

mod collector;
mod coordinator;
mod fetcher;
mod frontier;
mod monitor;
mod rate_limit;
mod worker;

pub use coordinator::{crawl, CrawlOutcome, CrawlReport, Crawler};
pub use monitor::{AbortReason, Cancelled, Shutdown};
pub use rate_limit::RateLimiter;
