use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Order in which the frontier hands out pending requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontierOrdering {
    /// Last scheduled, first fetched (depth-first)
    #[default]
    Lifo,
    /// First scheduled, first fetched (breadth-first)
    Fifo,
    /// Lowest priority value first, ties in scheduling order
    Priority,
}

/// Crawl engine behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Extra attempts allowed after a transient failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay (milliseconds)
    #[serde(default = "default_backoff_base")]
    pub backoff_base: u64,

    /// Ceiling for the exponential retry delay (milliseconds)
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap: u64,

    /// Maximum simultaneous in-flight requests to one host
    #[serde(default = "default_per_host_concurrency")]
    pub per_host_concurrency: u32,

    /// Maximum simultaneous in-flight requests overall
    #[serde(default = "default_total_concurrency")]
    pub total_concurrency: u32,

    /// Frontier ordering policy
    #[serde(default)]
    pub frontier_ordering: FrontierOrdering,

    /// Timeout for a single fetch attempt (milliseconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Follow-ups deeper than this are not scheduled
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Stop dispatching after this many requests
    #[serde(default)]
    pub max_requests: Option<u64>,

    /// Host patterns follow-ups must match (e.g. "example.com", "*.example.com")
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

impl CrawlerConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_millis(self.backoff_cap)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base: default_backoff_base(),
            backoff_cap: default_backoff_cap(),
            per_host_concurrency: default_per_host_concurrency(),
            total_concurrency: default_total_concurrency(),
            frontier_ordering: FrontierOrdering::default(),
            request_timeout: default_request_timeout(),
            max_depth: None,
            max_requests: None,
            allowed_domains: Vec::new(),
        }
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_base() -> u64 {
    500
}

fn default_backoff_cap() -> u64 {
    30_000
}

fn default_per_host_concurrency() -> u32 {
    2
}

fn default_total_concurrency() -> u32 {
    8
}

fn default_request_timeout() -> u64 {
    30_000
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiHarvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/sumi-harvest".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the markdown summary file, if one should be written
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}
