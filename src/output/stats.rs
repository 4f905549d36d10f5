//! Console statistics for a finished run

use crate::crawler::{CrawlSummary, FailureKind};

/// Share of issued requests whose fetch eventually succeeded, in percent
pub fn success_rate(summary: &CrawlSummary) -> f64 {
    if summary.requests_issued == 0 {
        return 0.0;
    }

    let failed = summary.failures(FailureKind::Fetch) + summary.failures(FailureKind::Http);
    let fetched = summary.requests_issued.saturating_sub(failed);
    (fetched as f64 / summary.requests_issued as f64) * 100.0
}

/// Prints a run summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Requests issued: {}", summary.requests_issued);
    println!("  Retries: {}", summary.retries);
    println!("  Items produced: {}", summary.items_produced);
    println!("  Items dropped: {}", summary.items_dropped);
    println!("  Items completed: {}", summary.items_completed());
    println!("  Requests filtered: {}", summary.requests_filtered);
    println!("  Requests pending: {}", summary.requests_pending);
    if let Some(duration) = summary.duration() {
        println!(
            "  Duration: {:.2}s",
            duration.num_milliseconds() as f64 / 1000.0
        );
    }
    println!();

    if summary.total_failures() > 0 {
        println!("Failures by Kind:");
        for kind in FailureKind::all() {
            let count = summary.failures(kind);
            if count > 0 {
                println!("  {}: {}", kind, count);
            }
        }
        println!();
    }

    if summary.cancelled {
        println!("Run was cancelled before the frontier drained.");
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} requests issued)",
        success_rate(summary),
        summary.requests_issued
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate_empty() {
        assert_eq!(success_rate(&CrawlSummary::default()), 0.0);
    }

    #[test]
    fn test_success_rate_ignores_item_failures() {
        let mut summary = CrawlSummary {
            requests_issued: 4,
            ..CrawlSummary::default()
        };
        summary.record_failure(FailureKind::Http);
        summary.record_failure(FailureKind::Pipeline);
        summary.record_failure(FailureKind::Parse);

        assert_eq!(success_rate(&summary), 75.0);
    }
}
