//! Configuration module for Sumi-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; missing keys fall back to the defaults.
//!
//! # Example
//!
//! ```no_run
//! use sumi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Workers: {}", config.crawler.total_concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FrontierOrdering, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_crawler_config};
