//! Per-request work: fetch with retries, parse, then run items through the pipeline
//!
//! A worker never touches the frontier or the summary. It reports what happened
//! and the coordinator folds the report in.

use crate::crawler::failure::FailureKind;
use crate::crawler::fetcher::{FetchClass, FetchResult, Fetcher};
use crate::crawler::politeness::HostLimiter;
use crate::crawler::request::RequestSpec;
use crate::crawler::retry::RetryPolicy;
use crate::crawler::spider::{ParseError, Scheduler, Spider};
use crate::pipeline::{panic_message, ItemContext, ItemOutcome, Pipeline};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;

/// Everything a worker task needs, shared across tasks
pub(crate) struct WorkerContext<I> {
    pub fetcher: Arc<dyn Fetcher>,
    pub spider: Arc<dyn Spider<Item = I>>,
    pub pipeline: Arc<Pipeline<I>>,
    pub retry: RetryPolicy,
    pub hosts: Arc<HostLimiter>,
    pub request_timeout: Duration,
    pub cancel: CancellationToken,
}

impl<I> Clone for WorkerContext<I> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            spider: Arc::clone(&self.spider),
            pipeline: Arc::clone(&self.pipeline),
            retry: self.retry.clone(),
            hosts: Arc::clone(&self.hosts),
            request_timeout: self.request_timeout,
            cancel: self.cancel.clone(),
        }
    }
}

/// Outcome of processing one request
#[derive(Debug)]
pub(crate) struct WorkerReport {
    pub request: RequestSpec,
    pub retries: u64,
    pub failures: Vec<FailureKind>,
    pub items_produced: u64,
    pub items_dropped: u64,
    pub scheduled: Vec<RequestSpec>,
    pub cancelled: bool,
    /// Cancelled before the first attempt reached the fetcher
    pub unsent: bool,
}

impl WorkerReport {
    fn new(request: RequestSpec) -> Self {
        Self {
            request,
            retries: 0,
            failures: Vec::new(),
            items_produced: 0,
            items_dropped: 0,
            scheduled: Vec::new(),
            cancelled: false,
            unsent: false,
        }
    }
}

/// Processes one dequeued request to completion
///
/// `permit` is the host slot reserved at dispatch. It covers the first
/// attempt only; retries wait for a fresh slot after their back-off.
pub(crate) async fn process_request<I: Send + 'static>(
    ctx: WorkerContext<I>,
    request: RequestSpec,
    permit: Option<OwnedSemaphorePermit>,
) -> WorkerReport {
    let mut report = WorkerReport::new(request.clone());

    let response = match fetch_with_retries(&ctx, request, permit, &mut report).await {
        Some(response) => response,
        None => return report,
    };

    tracing::debug!(
        "Fetched {} ({}, {} bytes)",
        response.final_url(),
        response.describe(),
        response.body().len()
    );

    let mut scheduler = Scheduler::new(&response);
    let parsed = AssertUnwindSafe(ctx.spider.parse(&response, &mut scheduler))
        .catch_unwind()
        .await;

    let items = match parsed {
        Ok(Ok(items)) => items,
        Ok(Err(e)) => {
            tracing::warn!(
                "Spider '{}' failed on {}: {}",
                ctx.spider.name(),
                response.final_url(),
                e
            );
            report.failures.push(FailureKind::Parse);
            Vec::new()
        }
        Err(panic) => {
            let e = ParseError::Panicked {
                url: response.final_url().to_string(),
                message: panic_message(panic.as_ref()),
            };
            tracing::warn!("{}", e);
            report.failures.push(FailureKind::Parse);
            Vec::new()
        }
    };

    // Follow-ups are kept even when parsing failed part way
    let (scheduled, rejected) = scheduler.into_parts();
    for error in rejected {
        tracing::debug!("Rejected follow-up from {}: {}", response.final_url(), error);
        report.failures.push(FailureKind::Scheduling);
    }
    report.scheduled = scheduled;

    report.items_produced = items.len() as u64;
    for (index, item) in items.into_iter().enumerate() {
        let context = ItemContext {
            source_url: response.final_url().clone(),
            depth: response.request().depth(),
            index,
        };

        match ctx.pipeline.process(item, &context).await {
            ItemOutcome::Completed(_) => {}
            ItemOutcome::Dropped { .. } => report.items_dropped += 1,
            ItemOutcome::Failed(e) => {
                tracing::warn!("Item {} from {} failed: {}", index, context.source_url, e);
                report.failures.push(FailureKind::Pipeline);
            }
        }
    }

    report
}

/// Runs fetch attempts until success, a permanent failure, retry exhaustion or cancellation
async fn fetch_with_retries<I>(
    ctx: &WorkerContext<I>,
    request: RequestSpec,
    mut permit: Option<OwnedSemaphorePermit>,
    report: &mut WorkerReport,
) -> Option<FetchResult> {
    let mut current = request;
    let mut first = true;

    loop {
        if ctx.cancel.is_cancelled() {
            report.cancelled = true;
            report.unsent = first;
            return None;
        }
        first = false;

        let result = fetch_once(ctx, &current, permit.take()).await;

        match result.classify() {
            FetchClass::Success => return Some(result),
            FetchClass::Permanent => {
                tracing::warn!("Giving up on {}: {}", current, result.describe());
                report
                    .failures
                    .push(result.failure_kind().unwrap_or(FailureKind::Http));
                return None;
            }
            FetchClass::Transient => {
                if !ctx.retry.should_retry(current.retries()) {
                    tracing::warn!(
                        "Giving up on {} after {} attempt(s): {}",
                        current,
                        current.retries() + 1,
                        result.describe()
                    );
                    report
                        .failures
                        .push(result.failure_kind().unwrap_or(FailureKind::Fetch));
                    return None;
                }

                let delay = ctx.retry.delay(current.retries() + 1);
                tracing::debug!(
                    "Retrying {} in {}ms: {}",
                    current,
                    delay.as_millis(),
                    result.describe()
                );

                tokio::select! {
                    _ = ctx.cancel.cancelled() => {
                        report.cancelled = true;
                        return None;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                current = current.retried();
                report.retries += 1;
            }
        }
    }
}

/// One attempt, holding a per-host permit and bounded by the request timeout
async fn fetch_once<I>(
    ctx: &WorkerContext<I>,
    request: &RequestSpec,
    reserved: Option<OwnedSemaphorePermit>,
) -> FetchResult {
    let _permit = match (reserved, request.host()) {
        (Some(permit), _) => Some(permit),
        (None, Some(host)) => ctx.hosts.acquire(&host).await,
        (None, None) => None,
    };

    match tokio::time::timeout(ctx.request_timeout, ctx.fetcher.fetch(request)).await {
        Ok(result) => result,
        Err(_) => FetchResult::timed_out(request.clone(), ctx.request_timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::TransportErrorKind;
    use crate::pipeline::FnStage;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers attempts from a fixed list of statuses; 0 means a connection error
    struct Sequence {
        statuses: Mutex<VecDeque<u16>>,
        attempts: Mutex<u32>,
    }

    impl Sequence {
        fn new(statuses: &[u16]) -> Self {
            Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                attempts: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for Sequence {
        async fn fetch(&self, request: &RequestSpec) -> FetchResult {
            *self.attempts.lock().unwrap() += 1;
            let status = self.statuses.lock().unwrap().pop_front().unwrap_or(200);
            if status == 0 {
                FetchResult::transport_error(
                    request.clone(),
                    TransportErrorKind::Connect,
                    "refused",
                )
            } else {
                FetchResult::response(request.clone(), request.url().clone(), status, "a\nb\nc")
            }
        }
    }

    struct Lines;

    #[async_trait]
    impl Spider for Lines {
        type Item = String;

        async fn parse(
            &self,
            response: &FetchResult,
            scheduler: &mut Scheduler,
        ) -> Result<Vec<String>, ParseError> {
            let _ = scheduler.follow("/next");
            let _ = scheduler.follow("http://[broken");
            Ok(response.text().lines().map(str::to_string).collect())
        }
    }

    fn context(fetcher: Arc<Sequence>, pipeline: Pipeline<String>) -> WorkerContext<String> {
        WorkerContext {
            fetcher,
            spider: Arc::new(Lines),
            pipeline: Arc::new(pipeline),
            retry: RetryPolicy {
                max_retries: 2,
                base: Duration::from_millis(1),
                cap: Duration::from_millis(2),
                jitter: false,
            },
            hosts: Arc::new(HostLimiter::new(1)),
            request_timeout: Duration::from_secs(5),
            cancel: CancellationToken::new(),
        }
    }

    fn request() -> RequestSpec {
        RequestSpec::new("https://example.com/start").unwrap()
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let fetcher = Arc::new(Sequence::new(&[503, 0, 200]));
        let ctx = context(fetcher.clone(), Pipeline::new());
        let report = process_request(ctx, request(), None).await;

        assert_eq!(*fetcher.attempts.lock().unwrap(), 3);
        assert_eq!(report.retries, 2);
        assert_eq!(report.items_produced, 3);
        assert_eq!(report.scheduled.len(), 1);
        assert_eq!(report.scheduled[0].depth(), 1);
        assert_eq!(report.failures, vec![FailureKind::Scheduling]);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let fetcher = Arc::new(Sequence::new(&[500, 500, 500, 200]));
        let ctx = context(fetcher.clone(), Pipeline::new());
        let report = process_request(ctx, request(), None).await;

        assert_eq!(*fetcher.attempts.lock().unwrap(), 3);
        assert_eq!(report.failures, vec![FailureKind::Http]);
        assert_eq!(report.items_produced, 0);
        assert!(report.scheduled.is_empty());
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let fetcher = Arc::new(Sequence::new(&[404]));
        let ctx = context(fetcher.clone(), Pipeline::new());
        let report = process_request(ctx, request(), None).await;

        assert_eq!(*fetcher.attempts.lock().unwrap(), 1);
        assert_eq!(report.retries, 0);
        assert_eq!(report.failures, vec![FailureKind::Http]);
    }

    #[tokio::test]
    async fn test_pipeline_outcomes_counted() {
        let stage = FnStage::new("filter", |s: String, _: &ItemContext| {
            if s == "a" {
                Ok(None)
            } else if s == "b" {
                Err(crate::pipeline::PipelineError::stage("filter", "bad b"))
            } else {
                Ok(Some(s))
            }
        });
        let fetcher = Arc::new(Sequence::new(&[200]));
        let report = process_request(
            context(fetcher, Pipeline::new().with_stage(stage)),
            request(),
            None,
        )
        .await;

        assert_eq!(report.items_produced, 3);
        assert_eq!(report.items_dropped, 1);
        assert_eq!(
            report.failures,
            vec![FailureKind::Scheduling, FailureKind::Pipeline]
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch() {
        let fetcher = Arc::new(Sequence::new(&[200]));
        let ctx = context(fetcher.clone(), Pipeline::new());
        ctx.cancel.cancel();

        let report = process_request(ctx, request(), None).await;
        assert!(report.cancelled);
        assert!(report.unsent);
        assert_eq!(*fetcher.attempts.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reserved_permit_released_for_retry() {
        let fetcher = Arc::new(Sequence::new(&[503, 200]));
        let ctx = context(fetcher.clone(), Pipeline::new());
        let permit = ctx.hosts.try_acquire("example.com");
        assert!(permit.is_some());

        // With a limit of one, the retry can only proceed if the reserved slot was freed
        let report = tokio::time::timeout(
            Duration::from_secs(2),
            process_request(ctx.clone(), request(), permit),
        )
        .await
        .unwrap();

        assert_eq!(report.retries, 1);
        assert!(!report.unsent);
        assert_eq!(ctx.hosts.in_flight("example.com"), 0);
        assert_eq!(ctx.hosts.request_count("example.com"), 2);
    }
}
