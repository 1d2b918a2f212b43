use crate::robots::ParsedRobots;
use chrono::{DateTime, Utc};

/// Where a robots policy came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotsSource {
    /// robots.txt was fetched and parsed
    Fetched,
    /// The site has no robots.txt (4xx); everything is allowed
    Missing,
    /// robots.txt could not be retrieved; failing open
    Unavailable,
    /// robots.txt handling is switched off
    Disabled,
}

/// Robots rules for one origin, fixed for the rest of the run
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    pub rules: ParsedRobots,
    pub source: RobotsSource,
    pub fetched_at: DateTime<Utc>,
}

impl RobotsPolicy {
    pub fn new(rules: ParsedRobots, source: RobotsSource) -> Self {
        Self {
            rules,
            source,
            fetched_at: Utc::now(),
        }
    }

    /// A policy that allows everything
    pub fn permissive(source: RobotsSource) -> Self {
        Self::new(ParsedRobots::allow_all(), source)
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.rules.is_allowed(url, user_agent)
    }

    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.rules.crawl_delay(user_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_policy_allows_everything() {
        let policy = RobotsPolicy::permissive(RobotsSource::Unavailable);
        assert!(policy.is_allowed("https://example.com/private", "docsweep"));
        assert_eq!(policy.crawl_delay("docsweep"), None);
    }

    #[test]
    fn test_policy_delegates_to_rules() {
        let policy = RobotsPolicy::new(
            ParsedRobots::from_content("User-agent: *\nDisallow: /private\nCrawl-delay: 4"),
            RobotsSource::Fetched,
        );
        assert!(!policy.is_allowed("https://example.com/private", "docsweep"));
        assert_eq!(policy.crawl_delay("docsweep"), Some(4.0));
        assert!(policy.fetched_at <= Utc::now());
    }
}
