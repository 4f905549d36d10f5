use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged at startup so that two runs can be matched to the exact
/// configuration they used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

/// Loads a configuration and returns both the config and its hash
///
/// The file is read once, so the hash always matches the parsed content.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrontierOrdering;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
max-retries = 4
backoff-base = 250
backoff-cap = 8000
per-host-concurrency = 1
total-concurrency = 16
frontier-ordering = "fifo"
request-timeout = 5000
max-depth = 3
allowed-domains = ["example.com", "*.example.org"]

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
summary-path = "./summary.md"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_retries, 4);
        assert_eq!(config.crawler.total_concurrency, 16);
        assert_eq!(config.crawler.frontier_ordering, FrontierOrdering::Fifo);
        assert_eq!(config.crawler.max_depth, Some(3));
        assert_eq!(config.crawler.max_requests, None);
        assert_eq!(config.crawler.allowed_domains.len(), 2);
        assert_eq!(config.user_agent.crawler_name, "TestCrawler");
        assert_eq!(config.output.summary_path.as_deref(), Some("./summary.md"));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = parse_config("").unwrap();

        assert_eq!(config.crawler.max_retries, 2);
        assert_eq!(config.crawler.frontier_ordering, FrontierOrdering::Lifo);
        assert_eq!(config.crawler.total_concurrency, 8);
        assert!(config.output.summary_path.is_none());
    }

    #[test]
    fn test_partial_crawler_section() {
        let config = parse_config("[crawler]\nfrontier-ordering = \"priority\"\n").unwrap();

        assert_eq!(config.crawler.frontier_ordering, FrontierOrdering::Priority);
        assert_eq!(config.crawler.backoff_base, 500);
    }

    #[test]
    fn test_unknown_ordering_rejected() {
        let result = parse_config("[crawler]\nfrontier-ordering = \"random\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[crawler]\ntotal-concurrency = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_load_with_hash_matches_file_hash() {
        let file = create_temp_config("[crawler]\nmax-retries = 1\n");

        let (config, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(config.crawler.max_retries, 1);
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
