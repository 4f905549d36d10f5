//! Sumi-Harvest: a pluggable crawl engine
//!
//! This crate drives a crawl from a single seed request: it pulls requests from a
//! deduplicating frontier, fetches them, hands each response to a [`Spider`] for
//! extraction, and routes every extracted item through an ordered [`Pipeline`].
//! Failures are retried, classified and counted; none of them stop a running crawl.

pub mod config;
pub mod crawler;
pub mod output;
pub mod pipeline;
pub mod spiders;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
///
/// These are the errors that can abort a crawl, and they only occur before the
/// first request is issued. Everything that goes wrong during a run is recorded
/// in the [`CrawlSummary`] instead.
#[derive(Debug, Error)]
pub enum SumiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid seed URL '{url}': {source}")]
    InvalidSeed { url: String, source: UrlError },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, SumiError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    run, CrawlSummary, Crawler, FailureKind, FetchResult, Fetcher, Frontier, FrontierOrdering,
    RequestSpec, Scheduler, Spider,
};
pub use pipeline::{Pipeline, PipelineStage};
pub use state::RunState;
pub use crate::url::{extract_domain, normalize_url, resolve_url};
