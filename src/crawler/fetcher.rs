//! Fetch results and the fetcher collaborator
//!
//! This module handles:
//! - The immutable [`FetchResult`] record of one completed fetch attempt
//! - Classifying a result as success, transient or permanent failure
//! - The [`Fetcher`] trait the engine fetches through
//! - [`HttpFetcher`], the reqwest-backed implementation

use crate::config::{Config, UserAgentConfig};
use crate::crawler::failure::FailureKind;
use crate::crawler::request::RequestSpec;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops the HTTP fetcher follows
const MAX_REDIRECTS: usize = 10;

/// Kind of transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// No response within the request timeout
    Timeout,
    /// DNS, refused or reset connection, TLS failure
    Connect,
    /// Anything else the transport reported (body read errors, redirect loops)
    Other,
}

/// A fetch attempt that produced no HTTP status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

/// Outcome of a fetch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// The server answered with this status code
    Http(u16),
    /// No response was obtained
    Transport(TransportError),
}

/// How the engine treats a fetch result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchClass {
    /// 2xx: hand to the spider
    Success,
    /// Transport failure or 5xx: retry per policy
    Transient,
    /// Any other status (4xx, unfollowed 3xx): drop immediately
    Permanent,
}

/// Record of one completed fetch attempt
///
/// Immutable once produced; spiders only ever see it by shared reference.
#[derive(Debug, Clone)]
pub struct FetchResult {
    request: RequestSpec,
    final_url: Url,
    status: FetchStatus,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl FetchResult {
    /// Builds a result for a response the server returned
    pub fn response(
        request: RequestSpec,
        final_url: Url,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            request,
            final_url,
            status: FetchStatus::Http(status),
            content_type: None,
            body: body.into(),
        }
    }

    /// Builds a result for an attempt that produced no response
    pub fn transport_error(
        request: RequestSpec,
        kind: TransportErrorKind,
        message: impl Into<String>,
    ) -> Self {
        let final_url = request.url().clone();
        Self {
            request,
            final_url,
            status: FetchStatus::Transport(TransportError {
                kind,
                message: message.into(),
            }),
            content_type: None,
            body: Vec::new(),
        }
    }

    /// Builds the result for an attempt cut off by the engine's request timeout
    pub fn timed_out(request: RequestSpec, after: Duration) -> Self {
        Self::transport_error(
            request,
            TransportErrorKind::Timeout,
            format!("no response within {}ms", after.as_millis()),
        )
    }

    /// Attaches the response Content-Type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// The request this attempt was made for
    pub fn request(&self) -> &RequestSpec {
        &self.request
    }

    /// URL after redirects; relative links on the page resolve against it
    pub fn final_url(&self) -> &Url {
        &self.final_url
    }

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    /// HTTP status code, if the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self.status {
            FetchStatus::Http(code) => Some(code),
            FetchStatus::Transport(_) => None,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns true if the Content-Type header says HTML (or is missing)
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(true, |ct| ct.to_ascii_lowercase().contains("text/html"))
    }

    /// Raw response body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Response body decoded as UTF-8, with invalid sequences replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Classifies this attempt
    ///
    /// | Outcome | Class |
    /// |---------|-------|
    /// | 2xx | Success |
    /// | 5xx | Transient |
    /// | Transport error (incl. timeout) | Transient |
    /// | Anything else | Permanent |
    pub fn classify(&self) -> FetchClass {
        match &self.status {
            FetchStatus::Http(code) if (200..300).contains(code) => FetchClass::Success,
            FetchStatus::Http(code) if (500..600).contains(code) => FetchClass::Transient,
            FetchStatus::Http(_) => FetchClass::Permanent,
            FetchStatus::Transport(_) => FetchClass::Transient,
        }
    }

    /// Failure category this result is counted under, if it is a failure
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.classify() {
            FetchClass::Success => None,
            _ => match self.status {
                FetchStatus::Http(_) => Some(FailureKind::Http),
                FetchStatus::Transport(_) => Some(FailureKind::Fetch),
            },
        }
    }

    /// Short description of the outcome for log lines
    pub fn describe(&self) -> String {
        match &self.status {
            FetchStatus::Http(code) => format!("HTTP {}", code),
            FetchStatus::Transport(error) => error.to_string(),
        }
    }
}

/// Issues a request and reports what happened
///
/// Implementations may retry at the transport layer, but must return a final
/// outcome rather than retrying indefinitely. Failures are reported inside the
/// [`FetchResult`], never as a panic.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &RequestSpec) -> FetchResult;
}

/// Fetcher backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher from the crawl configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;
        Ok(Self { client })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &RequestSpec) -> FetchResult {
        fetch_url(&self.client, request).await
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Overall timeout for a single request
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::UserAgentConfig;
/// use sumi_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a request's URL and converts the outcome into a [`FetchResult`]
///
/// Redirects are followed (up to 10 hops) so `final_url` is where the body came
/// from. Every status is returned as-is; classification is left to the engine.
pub async fn fetch_url(client: &Client, request: &RequestSpec) -> FetchResult {
    let response = match client.get(request.url().clone()).send().await {
        Ok(response) => response,
        Err(e) => return classify_transport_error(request, &e),
    };

    let status = response.status().as_u16();
    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match response.bytes().await {
        Ok(body) => {
            let result = FetchResult::response(request.clone(), final_url, status, body.to_vec());
            match content_type {
                Some(ct) => result.with_content_type(ct),
                None => result,
            }
        }
        Err(e) => classify_transport_error(request, &e),
    }
}

fn classify_transport_error(request: &RequestSpec, error: &reqwest::Error) -> FetchResult {
    let kind = if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };

    FetchResult::transport_error(request.clone(), kind, error.to_string())
}
