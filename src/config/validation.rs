use crate::config::types::{Config, CrawlerConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on the global worker count
const MAX_TOTAL_CONCURRENCY: u32 = 256;

/// Upper bound on retry attempts per request
const MAX_RETRIES: u32 = 20;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl engine configuration
pub fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.total_concurrency < 1 || config.total_concurrency > MAX_TOTAL_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "total_concurrency must be between 1 and {}, got {}",
            MAX_TOTAL_CONCURRENCY, config.total_concurrency
        )));
    }

    if config.per_host_concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "per_host_concurrency must be >= 1, got {}",
            config.per_host_concurrency
        )));
    }

    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    if config.backoff_base > config.backoff_cap {
        return Err(ConfigError::Validation(format!(
            "backoff_base ({}ms) must not exceed backoff_cap ({}ms)",
            config.backoff_base, config.backoff_cap
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1ms".to_string(),
        ));
    }

    if config.max_requests == Some(0) {
        return Err(ConfigError::Validation(
            "max_requests must be >= 1 when set".to_string(),
        ));
    }

    for pattern in &config.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.summary_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "summary_path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates a domain pattern (supports a leading `*.` wildcard)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
