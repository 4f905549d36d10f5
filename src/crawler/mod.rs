//! Crawl engine
//!
//! This module contains the core crawling logic, including:
//! - The deduplicating frontier and its ordering policies
//! - HTTP fetching and outcome classification
//! - Retry with exponential back-off and per-host concurrency limits
//! - The spider contract and the coordinator that ties it all together

mod coordinator;
mod failure;
mod fetcher;
mod frontier;
mod politeness;
mod request;
mod retry;
mod spider;
mod summary;
mod worker;

pub use crate::config::FrontierOrdering;
pub use coordinator::{run, Crawler};
pub use failure::{FailureKind, SchedulingError};
pub use fetcher::{
    build_http_client, fetch_url, FetchClass, FetchResult, FetchStatus, Fetcher, HttpFetcher,
    TransportError, TransportErrorKind,
};
pub use frontier::{FifoQueue, Frontier, LifoQueue, PendingQueue, PriorityQueue};
pub use politeness::HostLimiter;
pub use request::RequestSpec;
pub use retry::RetryPolicy;
pub use spider::{ParseError, Scheduler, Spider};
pub use summary::CrawlSummary;
