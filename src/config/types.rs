use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Resolved crawl configuration
///
/// Built once before the run starts (from defaults, an optional TOML file and
/// command-line overrides) and shared read-only with every component.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Number of concurrent fetch workers
    pub workers: usize,

    /// Maximum number of pages admitted to the frontier
    pub max_pages: usize,

    /// Minimum extracted content length (characters) for a page to be kept
    pub min_content_length: usize,

    /// Directory holding the content-addressed page cache
    pub cache_dir: PathBuf,

    /// Whether robots.txt rules are honored
    pub respect_robots: bool,

    /// HTTP Basic credentials sent with every request
    pub auth: Option<BasicAuth>,

    /// Extra request headers sent with every request
    pub headers: BTreeMap<String, String>,

    /// Abort the run when no progress is made for this many seconds
    pub stall_timeout_secs: u64,

    /// Number of retries after the first failed attempt
    pub retry_limit: u32,

    /// Minimum spacing between the start of two outbound requests (milliseconds)
    pub rate_limit_interval_ms: u64,

    /// Remove all cached pages before the run
    pub clear_cache_first: bool,

    /// Verbose extraction diagnostics
    pub debug: bool,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Base delay of the exponential retry backoff (milliseconds)
    pub retry_base_delay_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds)
    pub max_backoff_ms: u64,

    /// User-Agent header value
    pub user_agent: String,

    /// Deepest heading level listed in the table of contents
    pub toc_depth: u8,

    /// Single-page-application detection thresholds
    pub spa: SpaConfig,
}

/// HTTP Basic authentication credentials
#[derive(Clone, Deserialize, Serialize)]
pub struct BasicAuth {
    pub username: String,

    #[serde(skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Thresholds for the single-page-application heuristic
///
/// Five indicators are evaluated; the crawl aborts when at least `quorum` of
/// them fire on one of the first `probe_pages` pages in discovery order.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SpaConfig {
    /// Number of indicators that must fire
    pub quorum: usize,

    /// Only pages with a discovery sequence below this value are probed
    pub probe_pages: u64,

    /// Documents smaller than this many bytes count as "tiny"
    pub max_html_bytes: usize,

    /// Fewer links than this count as "no navigation"
    pub min_links: usize,

    /// Less visible text than this counts as "no text"
    pub min_text_chars: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            max_pages: 500,
            min_content_length: 100,
            cache_dir: PathBuf::from(".cache"),
            respect_robots: true,
            auth: None,
            headers: BTreeMap::new(),
            stall_timeout_secs: 30,
            retry_limit: 3,
            rate_limit_interval_ms: 500,
            clear_cache_first: false,
            debug: false,
            request_timeout_secs: 15,
            retry_base_delay_ms: 1000,
            max_backoff_ms: 30_000,
            user_agent: default_user_agent(),
            toc_depth: 3,
            spa: SpaConfig::default(),
        }
    }
}

impl Default for SpaConfig {
    fn default() -> Self {
        Self {
            quorum: 4,
            probe_pages: 3,
            max_html_bytes: 1500,
            min_links: 3,
            min_text_chars: 200,
        }
    }
}

impl CrawlConfig {
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs)
    }

    pub fn rate_limit_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Product token used when matching robots.txt user-agent groups
    ///
    /// `docsweep/1.0 (+https://...)` becomes `docsweep`.
    pub fn robots_agent(&self) -> &str {
        self.user_agent
            .split(|c: char| c == '/' || c.is_whitespace())
            .next()
            .filter(|token| !token.is_empty())
            .unwrap_or("*")
    }
}

fn default_user_agent() -> String {
    format!(
        "docsweep/{} (+https://github.com/docsweep/docsweep)",
        crate::VERSION
    )
}
