use crate::config::types::{Config, CrawlConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    let start = Url::parse(&config.start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start-url: {e}")))?;

    if start.scheme() != "http" && start.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "start-url must use http or https, got '{}'",
            start.scheme()
        )));
    }

    validate_domain_string(&config.base_domain)?;

    // A start URL outside the configured scope would be rejected by the
    // scope guard on the very first dequeue.
    if start.host_str() != Some(config.base_domain.as_str()) {
        return Err(ConfigError::Validation(format!(
            "start-url host '{}' does not match base-domain '{}'",
            start.host_str().unwrap_or(""),
            config.base_domain
        )));
    }

    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1".to_string(),
        ));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max-retries must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    for prefix in &config.path_prefixes {
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "path-prefixes entries must start with '/', got '{prefix}'"
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.snapshot_path.is_empty() {
        return Err(ConfigError::Validation(
            "snapshot-path cannot be empty".to_string(),
        ));
    }

    if config.log_path.is_empty() {
        return Err(ConfigError::Validation(
            "log-path cannot be empty".to_string(),
        ));
    }

    if config.snapshot_path == config.log_path {
        return Err(ConfigError::Validation(
            "snapshot-path and log-path must differ".to_string(),
        ));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(
            "checkpoint-interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates a bare domain string (host only, no scheme or path)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::Validation(
            "base-domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "base-domain '{domain}' contains invalid characters"
        )));
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(ConfigError::Validation(format!(
            "base-domain '{domain}' cannot start or end with '.'"
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::Validation(format!(
            "base-domain '{domain}' cannot contain consecutive dots"
        )));
    }

    Ok(())
}
