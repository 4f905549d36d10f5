//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of a finished run.

use crate::crawler::{CrawlSummary, FailureKind};
use crate::output::stats::success_rate;
use crate::output::{OutputResult, RunInfo};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of a run to `output_path`
///
/// # Arguments
///
/// * `summary` - The counters of the finished run
/// * `info` - Seed, spider and configuration hash of the run
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(
    summary: &CrawlSummary,
    info: &RunInfo,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary, info);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary, info: &RunInfo) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Harvest Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", info.seed));
    md.push_str(&format!("- **Spider**: {}\n", info.spider));
    if let Some(started) = summary.started_at {
        md.push_str(&format!("- **Started**: {}\n", started.to_rfc3339()));
    }
    if let Some(finished) = summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = summary.duration() {
        let seconds = duration.num_milliseconds() as f64 / 1000.0;
        md.push_str(&format!(
            "- **Duration**: {:.2} seconds ({:.2} minutes)\n",
            seconds,
            seconds / 60.0
        ));
    }
    let status = if summary.cancelled {
        "cancelled"
    } else {
        "completed"
    };
    md.push_str(&format!("- **Status**: {}\n", status));
    if let Some(hash) = &info.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str("| Counter | Value |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Requests Issued | {} |\n", summary.requests_issued));
    md.push_str(&format!("| Retries | {} |\n", summary.retries));
    md.push_str(&format!("| Items Produced | {} |\n", summary.items_produced));
    md.push_str(&format!("| Items Dropped | {} |\n", summary.items_dropped));
    md.push_str(&format!("| Items Completed | {} |\n", summary.items_completed()));
    md.push_str(&format!("| Requests Filtered | {} |\n", summary.requests_filtered));
    md.push_str(&format!("| Requests Pending | {} |\n", summary.requests_pending));
    md.push_str(&format!("| Total Failures | {} |\n", summary.total_failures()));
    md.push_str(&format!("| Success Rate | {:.2}% |\n\n", success_rate(summary)));

    // Failure breakdown
    if summary.total_failures() > 0 {
        md.push_str("## Failures by Kind\n\n");
        md.push_str("| Kind | Count |\n");
        md.push_str("|------|-------|\n");

        for kind in FailureKind::all() {
            let count = summary.failures(kind);
            if count > 0 {
                md.push_str(&format!("| {} | {} |\n", kind, count));
            }
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_summary() -> CrawlSummary {
        let mut summary = CrawlSummary::started();
        summary.requests_issued = 1000;
        summary.retries = 37;
        summary.items_produced = 5000;
        summary.items_dropped = 12;
        summary.record_failures(FailureKind::Http, 40);
        summary.record_failures(FailureKind::Fetch, 10);
        summary.finish();
        summary
    }

    fn info() -> RunInfo {
        RunInfo {
            seed: "https://example.com/".to_string(),
            spider: "page".to_string(),
            config_hash: Some("abc123".to_string()),
        }
    }

    #[test]
    fn test_format_markdown_summary() {
        let markdown = format_markdown_summary(&create_test_summary(), &info());

        assert!(markdown.contains("# Sumi-Harvest Crawl Summary"));
        assert!(markdown.contains("- **Seed**: https://example.com/"));
        assert!(markdown.contains("- **Config Hash**: abc123"));
        assert!(markdown.contains("- **Status**: completed"));
        assert!(markdown.contains("| Requests Issued | 1000 |"));
        assert!(markdown.contains("| Items Produced | 5000 |"));
        assert!(markdown.contains("| Success Rate | 95.00% |"));
    }

    #[test]
    fn test_markdown_failure_breakdown() {
        let markdown = format_markdown_summary(&create_test_summary(), &info());

        assert!(markdown.contains("## Failures by Kind"));
        assert!(markdown.contains("| FetchError | 10 |"));
        assert!(markdown.contains("| HTTPError | 40 |"));
        assert!(!markdown.contains("ParseError"));
    }

    #[test]
    fn test_markdown_without_failures_or_hash() {
        let mut summary = CrawlSummary::started();
        summary.cancelled = true;
        let info = RunInfo {
            config_hash: None,
            ..info()
        };

        let markdown = format_markdown_summary(&summary, &info);
        assert!(!markdown.contains("Failures by Kind"));
        assert!(!markdown.contains("Config Hash"));
        assert!(markdown.contains("- **Status**: cancelled"));
    }

    #[test]
    fn test_generate_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.md");

        generate_markdown_summary(&create_test_summary(), &info(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Sumi-Harvest Crawl Summary"));
    }
}
