//! The spider contract
//!
//! A [`Spider`] turns one successful [`FetchResult`] into a finite sequence of
//! items. Follow-up requests go through the [`Scheduler`] handle it is given;
//! that handle is the only way a spider influences what is crawled next.

use crate::crawler::failure::SchedulingError;
use crate::crawler::fetcher::FetchResult;
use crate::crawler::request::RequestSpec;
use crate::url::resolve_url;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Extraction failed to produce a well-formed item sequence
///
/// A page without the expected structure is not a parse error: return an
/// empty `Vec` instead. This is for genuine extraction malfunctions.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed document at {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("Spider panicked while parsing {url}: {message}")]
    Panicked { url: String, message: String },
}

impl ParseError {
    pub fn malformed(url: &Url, message: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

/// Site- or format-specific extraction logic
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use sumi_harvest::crawler::{FetchResult, ParseError, Scheduler, Spider};
///
/// struct Lines;
///
/// #[async_trait]
/// impl Spider for Lines {
///     type Item = String;
///
///     async fn parse(
///         &self,
///         response: &FetchResult,
///         scheduler: &mut Scheduler,
///     ) -> Result<Vec<String>, ParseError> {
///         let text = response.text();
///         for line in text.lines().filter(|l| l.starts_with("next: ")) {
///             // A malformed reference is counted by the engine; keep going
///             let _ = scheduler.follow(&line["next: ".len()..]);
///         }
///         Ok(text.lines().map(str::to_string).collect())
///     }
/// }
/// ```
#[async_trait]
pub trait Spider: Send + Sync + 'static {
    /// Item type produced; the engine never inspects it
    type Item: Send + 'static;

    /// Name used in log lines
    fn name(&self) -> &str {
        "spider"
    }

    /// Extracts items from a successful response and schedules follow-ups
    ///
    /// Items are delivered to the pipeline in the order of the returned `Vec`.
    async fn parse(
        &self,
        response: &FetchResult,
        scheduler: &mut Scheduler,
    ) -> Result<Vec<Self::Item>, ParseError>;
}

/// Handle a spider uses to request follow-up fetches
///
/// Relative references resolve against the response's final URL, and every
/// follow-up is one level deeper than the response it came from. Requests are
/// handed to the frontier after `parse` returns, where duplicates, depth and
/// offsite limits are applied.
#[derive(Debug)]
pub struct Scheduler {
    base: Url,
    child_depth: u32,
    accepted: Vec<RequestSpec>,
    rejected: Vec<SchedulingError>,
}

impl Scheduler {
    /// Creates a handle for follow-ups of the given response
    pub fn new(response: &FetchResult) -> Self {
        Self {
            base: response.final_url().clone(),
            child_depth: response.request().depth() + 1,
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// URL relative references are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Depth assigned to requests scheduled through this handle
    pub fn child_depth(&self) -> u32 {
        self.child_depth
    }

    /// Schedules a follow-up given as an absolute or relative reference
    ///
    /// A reference that cannot be resolved into an http(s) URL is recorded
    /// and returned as an error; the spider may ignore it.
    pub fn follow(&mut self, reference: &str) -> Result<(), SchedulingError> {
        self.follow_with_priority(reference, 0)
    }

    /// Like [`Scheduler::follow`], with an explicit priority
    pub fn follow_with_priority(
        &mut self,
        reference: &str,
        priority: i32,
    ) -> Result<(), SchedulingError> {
        match resolve_url(&self.base, reference) {
            Ok(url) => {
                let request = RequestSpec::from_normalized(url).with_priority(priority);
                self.schedule(request);
                Ok(())
            }
            Err(source) => {
                let error = SchedulingError {
                    reference: reference.to_string(),
                    source,
                };
                self.rejected.push(error.clone());
                Err(error)
            }
        }
    }

    /// Schedules a fully built request
    ///
    /// Its depth is overwritten with this handle's child depth; priority and
    /// the revisit override are kept.
    pub fn schedule(&mut self, request: RequestSpec) {
        self.accepted.push(request.with_depth(self.child_depth));
    }

    /// Number of follow-ups accepted so far
    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Splits the handle into accepted requests and rejected references
    pub(crate) fn into_parts(self) -> (Vec<RequestSpec>, Vec<SchedulingError>) {
        (self.accepted, self.rejected)
    }
}
