//! Run metadata record written next to the Markdown document

use super::stats::CrawlStats;
use crate::config::{CrawlConfig, SpaConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Structured summary of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunMetadata {
    pub version: String,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: String,
    pub config: ConfigSummary,
    pub stats: CrawlStats,
    pub warnings: Vec<String>,
}

/// The resolved configuration without secrets
///
/// Only the auth username and the custom header names are recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigSummary {
    pub workers: usize,
    pub max_pages: usize,
    pub min_content_length: usize,
    pub cache_dir: PathBuf,
    pub respect_robots: bool,
    pub auth_username: Option<String>,
    pub header_names: Vec<String>,
    pub stall_timeout_secs: u64,
    pub retry_limit: u32,
    pub rate_limit_interval_ms: u64,
    pub clear_cache_first: bool,
    pub debug: bool,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub toc_depth: u8,
    pub spa: SpaConfig,
}

impl From<&CrawlConfig> for ConfigSummary {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            workers: config.workers,
            max_pages: config.max_pages,
            min_content_length: config.min_content_length,
            cache_dir: config.cache_dir.clone(),
            respect_robots: config.respect_robots,
            auth_username: config.auth.as_ref().map(|auth| auth.username.clone()),
            header_names: config.headers.keys().cloned().collect(),
            stall_timeout_secs: config.stall_timeout_secs,
            retry_limit: config.retry_limit,
            rate_limit_interval_ms: config.rate_limit_interval_ms,
            clear_cache_first: config.clear_cache_first,
            debug: config.debug,
            request_timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            toc_depth: config.toc_depth,
            spa: config.spa.clone(),
        }
    }
}
