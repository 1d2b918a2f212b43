use crate::config::types::{BasicAuth, CrawlConfig, SpaConfig};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_pool(config)?;
    validate_timing(config)?;
    validate_spa(&config.spa)?;
    validate_headers(config)?;
    if let Some(auth) = &config.auth {
        validate_auth(auth)?;
    }

    if config.cache_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "cache_dir cannot be empty".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.toc_depth < 1 || config.toc_depth > 6 {
        return Err(ConfigError::Validation(format!(
            "toc_depth must be between 1 and 6, got {}",
            config.toc_depth
        )));
    }

    Ok(())
}

/// Validates a base URL: absolute, HTTP(S), with a host
pub fn validate_base_url(base_url: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base URL '{}': {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Base URL '{}' must use http or https",
            base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Base URL '{}' has no host",
            base_url
        )));
    }

    Ok(url)
}

fn validate_pool(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.retry_limit > 10 {
        return Err(ConfigError::Validation(format!(
            "retry_limit must be <= 10, got {}",
            config.retry_limit
        )));
    }

    Ok(())
}

fn validate_timing(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.stall_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "stall_timeout must be >= 1s".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1s".to_string(),
        ));
    }

    if config.max_backoff_ms < config.retry_base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max_backoff ({}ms) must be >= retry_base_delay ({}ms)",
            config.max_backoff_ms, config.retry_base_delay_ms
        )));
    }

    Ok(())
}

fn validate_spa(spa: &SpaConfig) -> Result<(), ConfigError> {
    if spa.quorum < 1 || spa.quorum > 5 {
        return Err(ConfigError::Validation(format!(
            "spa.quorum must be between 1 and 5, got {}",
            spa.quorum
        )));
    }

    if spa.probe_pages < 1 {
        return Err(ConfigError::Validation(
            "spa.probe_pages must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_headers(config: &CrawlConfig) -> Result<(), ConfigError> {
    for (name, value) in &config.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(format!("invalid header name '{}'", name)))?;
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::InvalidHeader(format!("invalid value for header '{}'", name))
        })?;
    }
    Ok(())
}

fn validate_auth(auth: &BasicAuth) -> Result<(), ConfigError> {
    if auth.username.is_empty() {
        return Err(ConfigError::Validation(
            "auth username cannot be empty".to_string(),
        ));
    }

    if auth.username.contains(':') {
        return Err(ConfigError::Validation(
            "auth username cannot contain ':'".to_string(),
        ));
    }

    Ok(())
}
