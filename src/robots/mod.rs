//! Robots.txt handling module
//!
//! This module fetches, parses and caches robots.txt per origin and answers
//! allow/deny questions for the crawl. robots.txt is fetched at most once per
//! origin and run; a failed fetch allows everything.

mod parser;
mod policy;

pub use parser::ParsedRobots;
pub use policy::{RobotsPolicy, RobotsSource};

use crate::crawler::{Cancelled, RateLimiter};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

type PolicyCell = Arc<OnceCell<Arc<RobotsPolicy>>>;

/// Allow/deny gate consulted before every page fetch
pub struct RobotsGate {
    client: Client,
    agent: String,
    enabled: bool,
    limiter: Arc<RateLimiter>,
    policies: Mutex<HashMap<String, PolicyCell>>,
}

impl RobotsGate {
    /// Creates a gate
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for robots.txt requests
    /// * `agent` - Product token matched against user-agent groups
    /// * `enabled` - When false every URL is allowed and nothing is fetched
    /// * `limiter` - Shared request gate; robots.txt requests count as requests
    pub fn new(client: Client, agent: &str, enabled: bool, limiter: Arc<RateLimiter>) -> Self {
        Self {
            client,
            agent: agent.to_string(),
            enabled,
            limiter,
            policies: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether a URL may be fetched
    ///
    /// The first call for an origin fetches its robots.txt; concurrent
    /// callers for the same origin wait for that single fetch.
    pub async fn allowed(&self, url: &Url, cancel: &CancellationToken) -> Result<bool, Cancelled> {
        if !self.enabled {
            return Ok(true);
        }

        let policy = self.policy_for(url, cancel).await?;
        let allowed = policy.is_allowed(url.as_str(), &self.agent);
        if !allowed {
            debug!("robots.txt disallows {}", url);
        }
        Ok(allowed)
    }

    /// Returns the cached policy for the URL's origin, fetching it if needed
    pub async fn policy_for(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Arc<RobotsPolicy>, Cancelled> {
        if !self.enabled {
            return Ok(Arc::new(RobotsPolicy::permissive(RobotsSource::Disabled)));
        }

        let origin = url.origin().ascii_serialization();
        let cell = {
            let mut policies = self.policies.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(policies.entry(origin).or_default())
        };

        // A cancelled fetch leaves the cell empty
        let policy = cell
            .get_or_try_init(|| self.fetch_policy(url, cancel))
            .await?;
        Ok(Arc::clone(policy))
    }

    async fn fetch_policy(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Arc<RobotsPolicy>, Cancelled> {
        let robots_url = match url.join("/robots.txt") {
            Ok(robots_url) => robots_url,
            Err(e) => {
                warn!("Cannot build robots.txt URL for {}: {}", url, e);
                return Ok(Arc::new(RobotsPolicy::permissive(RobotsSource::Unavailable)));
            }
        };

        self.limiter.throttle(cancel).await?;
        debug!("Fetching {}", robots_url);

        let response = tokio::select! {
            response = self.client.get(robots_url.clone()).send() => response,
            _ = cancel.cancelled() => return Err(Cancelled),
        };

        let policy = match response {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => {
                    RobotsPolicy::new(ParsedRobots::from_content(&body), RobotsSource::Fetched)
                }
                Err(e) => {
                    warn!("Failed to read {}: {}, allowing all", robots_url, e);
                    RobotsPolicy::permissive(RobotsSource::Unavailable)
                }
            },
            Ok(response) if response.status().is_client_error() => {
                debug!("No robots.txt at {} ({})", robots_url, response.status());
                RobotsPolicy::permissive(RobotsSource::Missing)
            }
            Ok(response) => {
                warn!(
                    "robots.txt at {} returned {}, allowing all",
                    robots_url,
                    response.status()
                );
                RobotsPolicy::permissive(RobotsSource::Unavailable)
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}, allowing all", robots_url, e);
                RobotsPolicy::permissive(RobotsSource::Unavailable)
            }
        };

        if let Some(delay) = policy.crawl_delay(&self.agent) {
            if delay > 0.0 {
                info!("robots.txt requests a crawl delay of {}s", delay);
                self.limiter
                    .raise_interval(Duration::from_secs_f64(delay.min(3600.0)));
            }
        }

        Ok(Arc::new(policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gate(enabled: bool) -> (RobotsGate, Arc<RateLimiter>) {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(1)));
        let gate = RobotsGate::new(Client::new(), "docsweep", enabled, Arc::clone(&limiter));
        (gate, limiter)
    }

    #[tokio::test]
    async fn test_disallowed_path_is_blocked_and_fetched_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (gate, _) = gate(true);
        let cancel = CancellationToken::new();
        let base = Url::parse(&server.uri()).unwrap();

        assert!(gate.allowed(&base.join("/docs").unwrap(), &cancel).await.unwrap());
        assert!(!gate
            .allowed(&base.join("/private/keys").unwrap(), &cancel)
            .await
            .unwrap());
        assert!(gate.allowed(&base.join("/other").unwrap(), &cancel).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (gate, _) = gate(true);
        let cancel = CancellationToken::new();
        let url = Url::parse(&format!("{}/anything", server.uri())).unwrap();

        assert!(gate.allowed(&url, &cancel).await.unwrap());
        let policy = gate.policy_for(&url, &cancel).await.unwrap();
        assert_eq!(policy.source, RobotsSource::Missing);
    }

    #[tokio::test]
    async fn test_server_error_fails_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (gate, _) = gate(true);
        let cancel = CancellationToken::new();
        let url = Url::parse(&format!("{}/private", server.uri())).unwrap();

        assert!(gate.allowed(&url, &cancel).await.unwrap());
        assert_eq!(
            gate.policy_for(&url, &cancel).await.unwrap().source,
            RobotsSource::Unavailable
        );
    }

    #[tokio::test]
    async fn test_crawl_delay_raises_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 2\n"),
            )
            .mount(&server)
            .await;

        let (gate, limiter) = gate(true);
        let cancel = CancellationToken::new();
        let url = Url::parse(&server.uri()).unwrap();

        gate.allowed(&url, &cancel).await.unwrap();
        assert_eq!(limiter.interval(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_disabled_gate_never_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
            .expect(0)
            .mount(&server)
            .await;

        let (gate, _) = gate(false);
        let cancel = CancellationToken::new();
        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        assert!(gate.allowed(&url, &cancel).await.unwrap());
    }
}
