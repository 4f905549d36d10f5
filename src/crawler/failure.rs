//! Classification of in-run failures
//!
//! None of these errors abort a crawl. Each one is logged where it happens and
//! counted under its [`FailureKind`] in the run summary.

use crate::UrlError;
use std::fmt;
use thiserror::Error;

/// Category an in-run failure is counted under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    /// Transport-level failure (DNS, connection, timeout) after retries ran out
    Fetch,
    /// Non-2xx response: 4xx immediately, 5xx after retries ran out
    Http,
    /// The spider failed to produce an item sequence for a response
    Parse,
    /// A pipeline stage failed on one item
    Pipeline,
    /// The spider asked to follow a malformed or unresolvable reference
    Scheduling,
}

impl FailureKind {
    /// Returns all failure kinds in reporting order
    pub fn all() -> [FailureKind; 5] {
        [
            Self::Fetch,
            Self::Http,
            Self::Parse,
            Self::Pipeline,
            Self::Scheduling,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "FetchError",
            Self::Http => "HTTPError",
            Self::Parse => "ParseError",
            Self::Pipeline => "PipelineError",
            Self::Scheduling => "SchedulingError",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A follow-up reference the spider produced that cannot become a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot schedule '{reference}': {source}")]
pub struct SchedulingError {
    pub reference: String,
    pub source: UrlError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(FailureKind::Fetch.to_string(), "FetchError");
        assert_eq!(FailureKind::Http.to_string(), "HTTPError");
        assert_eq!(FailureKind::Scheduling.as_str(), "SchedulingError");
    }

    #[test]
    fn test_all_is_sorted() {
        let all = FailureKind::all();
        let mut sorted = all;
        sorted.sort();
        assert_eq!(all, sorted);
    }

    #[test]
    fn test_scheduling_error_message() {
        let error = SchedulingError {
            reference: "mailto:x@y.z".to_string(),
            source: UrlError::InvalidScheme("mailto".to_string()),
        };
        assert!(error.to_string().contains("mailto:x@y.z"));
    }
}
