//! Run counters and the summary returned to the caller

use crate::crawler::failure::FailureKind;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// What happened during one crawl run
///
/// Owned by the crawler while the run is in progress and handed to the caller
/// when it ends. In-run failures show up here instead of as errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlSummary {
    /// Distinct requests taken from the frontier and fetched
    pub requests_issued: u64,

    /// Extra fetch attempts spent on transient failures
    pub retries: u64,

    /// Items returned by successful `parse` calls
    pub items_produced: u64,

    /// Items a pipeline stage chose to drop
    pub items_dropped: u64,

    /// Follow-ups refused by the depth cap or the offsite filter
    pub requests_filtered: u64,

    /// Requests still in the frontier when the run ended
    pub requests_pending: u64,

    /// Failure counts by category
    pub failures_by_kind: BTreeMap<FailureKind, u64>,

    /// Whether the run ended because it was cancelled
    pub cancelled: bool,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlSummary {
    /// Creates an empty summary stamped with the current time
    pub fn started() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Number of failures recorded under `kind`
    pub fn failures(&self, kind: FailureKind) -> u64 {
        self.failures_by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Total failures of every kind
    pub fn total_failures(&self) -> u64 {
        self.failures_by_kind.values().sum()
    }

    /// Wall-clock duration, once the run has finished
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Items that reached the end of the pipeline
    pub fn items_completed(&self) -> u64 {
        self.items_produced
            .saturating_sub(self.items_dropped)
            .saturating_sub(self.failures(FailureKind::Pipeline))
    }

    pub(crate) fn record_failure(&mut self, kind: FailureKind) {
        self.record_failures(kind, 1);
    }

    pub(crate) fn record_failures(&mut self, kind: FailureKind, count: u64) {
        if count > 0 {
            *self.failures_by_kind.entry(kind).or_insert(0) += count;
        }
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let summary = CrawlSummary::default();
        assert_eq!(summary.total_failures(), 0);
        assert_eq!(summary.failures(FailureKind::Http), 0);
        assert!(summary.duration().is_none());
    }

    #[test]
    fn test_record_failures() {
        let mut summary = CrawlSummary::started();
        summary.record_failure(FailureKind::Http);
        summary.record_failure(FailureKind::Http);
        summary.record_failures(FailureKind::Scheduling, 3);
        summary.record_failures(FailureKind::Parse, 0);

        assert_eq!(summary.failures(FailureKind::Http), 2);
        assert_eq!(summary.failures(FailureKind::Scheduling), 3);
        assert_eq!(summary.total_failures(), 5);
        assert!(!summary.failures_by_kind.contains_key(&FailureKind::Parse));
    }

    #[test]
    fn test_duration_after_finish() {
        let mut summary = CrawlSummary::started();
        summary.finish();
        let duration = summary.duration().unwrap();
        assert!(duration >= chrono::Duration::zero());
    }

    #[test]
    fn test_items_completed() {
        let mut summary = CrawlSummary {
            items_produced: 10,
            items_dropped: 3,
            ..CrawlSummary::default()
        };
        summary.record_failures(FailureKind::Pipeline, 2);
        assert_eq!(summary.items_completed(), 5);
    }
}
