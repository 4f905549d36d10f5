//! Output module for reporting crawl results
//!
//! This module handles:
//! - Generating markdown summaries of a finished run
//! - Printing run statistics to stdout

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_summary, success_rate};

use thiserror::Error;

/// Output-specific errors
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Facts about a run that live outside the summary counters
#[derive(Debug, Clone, Default)]
pub struct RunInfo {
    /// Seed URL the crawl started from
    pub seed: String,

    /// Spider name
    pub spider: String,

    /// SHA-256 of the configuration file, if one was loaded
    pub config_hash: Option<String>,
}
