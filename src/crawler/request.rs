//! Request specifications handed between the frontier, workers and spiders

use crate::url::{extract_domain, normalize_url};
use crate::UrlError;
use url::Url;

/// A request to fetch one resource
///
/// The URL is always normalized on construction, and its string form is the
/// identity the frontier deduplicates on. Depth, priority and retry count are
/// scheduling metadata only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    url: Url,
    depth: u32,
    priority: i32,
    retries: u32,
    allow_revisit: bool,
}

impl RequestSpec {
    /// Creates a depth-0 request from an absolute URL string
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_harvest::RequestSpec;
    ///
    /// let request = RequestSpec::new("https://Example.com/docs/#intro").unwrap();
    /// assert_eq!(request.identity(), "https://example.com/docs");
    /// assert_eq!(request.depth(), 0);
    /// ```
    pub fn new(url: &str) -> Result<Self, UrlError> {
        Ok(Self::from_normalized(normalize_url(url)?))
    }

    /// Creates a depth-0 request from an already parsed URL
    pub fn from_url(url: &Url) -> Result<Self, UrlError> {
        Self::new(url.as_str())
    }

    pub(crate) fn from_normalized(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            priority: 0,
            retries: 0,
            allow_revisit: false,
        }
    }

    /// Sets the priority (lower values are fetched first under priority ordering)
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the scheduling depth
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Lets this request bypass the frontier's seen-set
    ///
    /// The request is enqueued even if its identity was scheduled before.
    pub fn allow_revisit(mut self) -> Self {
        self.allow_revisit = true;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Normalized identity used for deduplication
    pub fn identity(&self) -> &str {
        self.url.as_str()
    }

    /// Host key used for politeness limits
    pub fn host(&self) -> Option<String> {
        extract_domain(&self.url)
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Number of attempts already made beyond the first
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn revisit_allowed(&self) -> bool {
        self.allow_revisit
    }

    /// Returns the same request with its retry count bumped
    pub(crate) fn retried(&self) -> Self {
        let mut next = self.clone();
        next.retries += 1;
        next
    }
}

impl std::fmt::Display for RequestSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
