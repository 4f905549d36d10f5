//! Crawl orchestration
//!
//! The coordinator owns the frontier and the summary. It dispatches requests
//! to a bounded set of worker tasks, folds their reports back in, and applies
//! the depth cap and offsite filter to every follow-up before it reaches the
//! frontier. The run ends when the frontier is empty and nothing is in flight,
//! or when cancellation has been requested and in-flight work has drained.

use crate::config::{validate, validate_crawler_config, Config, CrawlerConfig};
use crate::crawler::failure::FailureKind;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::politeness::HostLimiter;
use crate::crawler::request::RequestSpec;
use crate::crawler::retry::RetryPolicy;
use crate::crawler::spider::Spider;
use crate::crawler::summary::CrawlSummary;
use crate::crawler::worker::{process_request, WorkerContext, WorkerReport};
use crate::pipeline::{Pipeline, PipelineStage};
use crate::state::RunState;
use crate::url::HostFilter;
use crate::{Result, SumiError};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Log progress every N completed requests
const PROGRESS_INTERVAL: u64 = 10;

/// A single crawl run
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::Config;
/// use sumi_harvest::crawler::{Crawler, HttpFetcher, RequestSpec};
/// use sumi_harvest::pipeline::{LogItems, Pipeline};
/// use sumi_harvest::spiders::PageSpider;
///
/// # async fn demo() -> sumi_harvest::Result<()> {
/// let config = Config::default();
/// let fetcher = HttpFetcher::new(&config)?;
/// let pipeline = Pipeline::new().with_stage(LogItems);
///
/// let mut crawler = Crawler::new(config.crawler.clone(), fetcher, PageSpider::new(), pipeline)?;
/// let summary = crawler.run(RequestSpec::new("https://example.com/")?).await?;
/// println!("{} requests", summary.requests_issued);
/// # Ok(())
/// # }
/// ```
pub struct Crawler<I> {
    config: CrawlerConfig,
    fetcher: Arc<dyn Fetcher>,
    spider: Arc<dyn Spider<Item = I>>,
    pipeline: Arc<Pipeline<I>>,
    cancel: CancellationToken,
    state: RunState,
}

impl<I: Send + 'static> Crawler<I> {
    /// Creates an idle crawler
    ///
    /// Fails if the engine settings are out of range.
    pub fn new<F, S>(
        config: CrawlerConfig,
        fetcher: F,
        spider: S,
        pipeline: Pipeline<I>,
    ) -> Result<Self>
    where
        F: Fetcher + 'static,
        S: Spider<Item = I>,
    {
        validate_crawler_config(&config)?;

        Ok(Self {
            config,
            fetcher: Arc::new(fetcher),
            spider: Arc::new(spider),
            pipeline: Arc::new(pipeline),
            cancel: CancellationToken::new(),
            state: RunState::Idle,
        })
    }

    /// Uses an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops this crawl when cancelled
    ///
    /// After cancellation no new requests are dispatched; requests already in
    /// flight finish (or abandon their retry back-off) and `run` returns.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Runs the crawl from `seed` until the frontier drains or the crawl is cancelled
    ///
    /// The seed is always admitted, even if it falls outside `allowed-domains`.
    /// Only state misuse (running the same crawler twice) is an error; every
    /// per-request failure is counted in the returned summary.
    pub async fn run(&mut self, seed: RequestSpec) -> Result<CrawlSummary> {
        self.state = self.state.transition(RunState::Running)?;

        let mut summary = CrawlSummary::started();
        let mut frontier = Frontier::new(self.config.frontier_ordering);
        let filter = HostFilter::new(&self.config.allowed_domains);
        let max_workers = self.config.total_concurrency.max(1) as usize;
        let hosts = Arc::new(HostLimiter::new(
            self.config.per_host_concurrency as usize,
        ));
        // Requests whose host was saturated when they left the frontier
        let mut parked = VecDeque::new();

        let ctx = WorkerContext {
            fetcher: Arc::clone(&self.fetcher),
            spider: Arc::clone(&self.spider),
            pipeline: Arc::clone(&self.pipeline),
            retry: RetryPolicy::from_config(&self.config),
            hosts: Arc::clone(&hosts),
            request_timeout: self.config.request_timeout(),
            cancel: self.cancel.clone(),
        };

        tracing::info!(
            "Starting crawl at {} with spider '{}' ({} workers, {} per host, {:?} ordering)",
            seed,
            self.spider.name(),
            max_workers,
            self.config.per_host_concurrency,
            self.config.frontier_ordering
        );

        let open_errors = self.pipeline.open().await;
        summary.record_failures(FailureKind::Pipeline, open_errors.len() as u64);
        frontier.schedule(seed);

        let mut workers = JoinSet::new();
        let mut completed: u64 = 0;
        let mut cap_logged = false;

        loop {
            if !self.cancel.is_cancelled() {
                while workers.len() < max_workers {
                    if self.request_cap_reached(summary.requests_issued) {
                        if !cap_logged && (!frontier.is_empty() || !parked.is_empty()) {
                            tracing::info!(
                                "Request cap of {} reached, no further requests will be dispatched",
                                summary.requests_issued
                            );
                            cap_logged = true;
                        }
                        break;
                    }

                    match next_ready(&mut frontier, &mut parked, &hosts) {
                        Some((request, permit)) => {
                            tracing::debug!("Dispatching {} (depth {})", request, request.depth());
                            summary.requests_issued += 1;
                            workers.spawn(process_request(ctx.clone(), request, permit));
                        }
                        None => break,
                    }
                }
            }

            if workers.is_empty() {
                break;
            }

            let joined = tokio::select! {
                joined = workers.join_next() => joined,
                _ = self.cancel.cancelled(), if !summary.cancelled => {
                    tracing::warn!(
                        "Cancellation requested, draining {} in-flight request(s)",
                        workers.len()
                    );
                    summary.cancelled = true;
                    continue;
                }
            };

            match joined {
                Some(Ok(report)) => self.absorb(report, &mut frontier, &filter, &mut summary),
                Some(Err(e)) => {
                    tracing::error!("Worker task failed: {}", e);
                    summary.record_failure(FailureKind::Fetch);
                }
                None => break,
            }

            completed += 1;
            if completed % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Progress: {} completed, {} in flight, {} queued, {} failures",
                    completed,
                    workers.len(),
                    frontier.len() + parked.len(),
                    summary.total_failures()
                );
            }
        }

        let close_errors = self.pipeline.close().await;
        summary.record_failures(FailureKind::Pipeline, close_errors.len() as u64);

        summary.cancelled |= self.cancel.is_cancelled();
        summary.requests_pending += (frontier.len() + parked.len()) as u64;
        summary.finish();
        self.state = self.state.transition(RunState::Finished)?;

        tracing::info!(
            "Crawl finished: {} requests, {} items, {} failures{}",
            summary.requests_issued,
            summary.items_produced,
            summary.total_failures(),
            if summary.cancelled { " (cancelled)" } else { "" }
        );

        Ok(summary)
    }

    fn request_cap_reached(&self, issued: u64) -> bool {
        self.config.max_requests.map_or(false, |max| issued >= max)
    }

    /// Folds a worker report into the summary and admits its follow-ups
    fn absorb(
        &self,
        report: WorkerReport,
        frontier: &mut Frontier,
        filter: &HostFilter,
        summary: &mut CrawlSummary,
    ) {
        tracing::trace!(
            "Completed {}: {} item(s), {} follow-up(s)",
            report.request,
            report.items_produced,
            report.scheduled.len()
        );

        summary.retries += report.retries;
        summary.items_produced += report.items_produced;
        summary.items_dropped += report.items_dropped;
        summary.cancelled |= report.cancelled;
        if report.unsent {
            summary.requests_issued -= 1;
            summary.requests_pending += 1;
        }
        for kind in report.failures {
            summary.record_failure(kind);
        }

        for request in report.scheduled {
            if self.config.max_depth.map_or(false, |max| request.depth() > max) {
                tracing::trace!("Skipping {}: deeper than {:?}", request, self.config.max_depth);
                summary.requests_filtered += 1;
                continue;
            }

            if !filter.allows(request.url()) {
                tracing::trace!("Skipping {}: host not allowed", request);
                summary.requests_filtered += 1;
                continue;
            }

            frontier.schedule(request);
        }
    }
}

/// Takes the next request whose host has a free slot
///
/// Parked requests are retried first, oldest first. Frontier entries for a
/// saturated host are parked so that other hosts can still be dispatched.
fn next_ready(
    frontier: &mut Frontier,
    parked: &mut VecDeque<RequestSpec>,
    hosts: &HostLimiter,
) -> Option<(RequestSpec, Option<OwnedSemaphorePermit>)> {
    let ready = parked
        .iter()
        .enumerate()
        .find_map(|(i, request)| match request.host() {
            Some(host) => hosts.try_acquire(&host).map(|permit| (i, Some(permit))),
            None => Some((i, None)),
        });
    if let Some((i, permit)) = ready {
        return parked.remove(i).map(|request| (request, permit));
    }

    while let Some(request) = frontier.next() {
        match request.host() {
            Some(host) => match hosts.try_acquire(&host) {
                Some(permit) => return Some((request, Some(permit))),
                None => {
                    tracing::trace!("Parking {}: {} is at its limit", request, host);
                    parked.push_back(request);
                }
            },
            None => return Some((request, None)),
        }
    }

    None
}

/// Crawls from `seed` over HTTP with the given spider and pipeline stages
///
/// This is the one-call entry point. The whole configuration is validated and
/// the seed normalized before anything is fetched; those are the only failures
/// returned as errors.
pub async fn run<S: Spider>(
    seed: &str,
    spider: S,
    stages: Vec<Box<dyn PipelineStage<S::Item>>>,
    config: &Config,
) -> Result<CrawlSummary> {
    validate(config)?;

    let seed = RequestSpec::new(seed).map_err(|source| SumiError::InvalidSeed {
        url: seed.to_string(),
        source,
    })?;

    let fetcher = HttpFetcher::new(config)?;
    let mut crawler = Crawler::new(
        config.crawler.clone(),
        fetcher,
        spider,
        Pipeline::from_stages(stages),
    )?;

    crawler.run(seed).await
}
