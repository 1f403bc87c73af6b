//! Human-readable text output

use super::{format_duration_human, rate_per_sec};
use crate::distributed::ControlReport;
use std::fmt::Write;

/// Print the control report to stdout
pub fn print_report(report: &ControlReport) {
    print!("{}", render_report(report));
}

/// Render the control report
///
/// The first three lines are the classic summary: completion line, mean
/// response time in seconds, HTTP error count. Details follow.
pub fn render_report(report: &ControlReport) -> String {
    let stats = &report.stats;
    let mut out = String::new();

    // Progress markers leave the cursor mid-line
    out.push('\n');
    if report.all_received() {
        out.push_str("All responses received.\n");
    } else {
        let _ = writeln!(
            out,
            "Stopped after {} of {} responses.",
            stats.processed(),
            expected(report)
        );
    }
    let _ = writeln!(out, "AVG response time: {}.", stats.mean_latency().as_secs_f64());
    let _ = writeln!(out, "{} HTTP errors", stats.http_error_count());

    out.push('\n');
    let _ = writeln!(out, "Tasks sent:   {}", report.tasks_sent);
    let _ = writeln!(out, "Processed:    {}", stats.processed());
    let _ = writeln!(out, "Failures:     {}", stats.failure_count());
    let _ = writeln!(
        out,
        "Elapsed:      {:.3}s ({:.1} req/s)",
        report.elapsed.as_secs_f64(),
        rate_per_sec(stats.processed(), report.elapsed)
    );

    let hist = stats.histogram();
    if !hist.is_empty() {
        out.push('\n');
        out.push_str("Latency:\n");
        let _ = writeln!(out, "  mean: {}", format_duration_human(stats.mean_latency()));
        for (label, p) in [("p50", 50.0), ("p90", 90.0), ("p99", 99.0)] {
            if let Some(value) = hist.percentile(p) {
                let _ = writeln!(out, "  {}:  {}", label, format_duration_human(value));
            }
        }
        if let Some(max) = hist.max() {
            let _ = writeln!(out, "  max:  {}", format_duration_human(max));
        }
    }

    if !stats.status_counts().is_empty() {
        out.push('\n');
        out.push_str("Status codes:\n");
        for (code, count) in stats.status_counts() {
            let _ = writeln!(out, "  {}: {}", code, count);
        }
    }

    if !stats.per_worker().is_empty() {
        out.push('\n');
        out.push_str("Per worker:\n");
        for (worker_id, count) in stats.per_worker() {
            let _ = writeln!(out, "  P{}: {}", worker_id, count);
        }
    }

    out
}

fn expected(report: &ControlReport) -> String {
    if report.request_count == 0 {
        "unbounded".to_string()
    } else {
        report.request_count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::protocol::ResultDescriptor;
    use crate::stats::AggregateStats;
    use std::time::Duration;

    fn report(request_count: u64, results: &[ResultDescriptor]) -> ControlReport {
        let mut stats = AggregateStats::new();
        for result in results {
            stats.record(result);
        }
        ControlReport {
            tasks_sent: request_count,
            request_count,
            elapsed: Duration::from_secs(1),
            stats,
        }
    }

    #[test]
    fn test_summary_lines() {
        let results = vec![
            ResultDescriptor::success("http://a/", 0, Duration::from_millis(5), 200),
            ResultDescriptor::success("http://a/", 1, Duration::from_millis(5), 500),
        ];
        let text = render_report(&report(2, &results));

        assert!(text.contains("All responses received.\n"));
        assert!(text.contains("AVG response time: 0.005.\n"));
        assert!(text.contains("1 HTTP errors\n"));
        assert!(text.contains("  500: 1\n"));
        assert!(text.contains("  P1: 1\n"));
        assert!(text.contains("p99"));
    }

    #[test]
    fn test_incomplete_run() {
        let results = vec![ResultDescriptor::failure("http://a/", 0, "P0 Error: 'x'")];
        let text = render_report(&report(10, &results));

        assert!(text.contains("Stopped after 1 of 10 responses."));
        assert!(text.contains("Failures:     1"));
        // No successful response, no latency section
        assert!(!text.contains("Latency:"));
    }

    #[test]
    fn test_unbounded_run() {
        let text = render_report(&report(0, &[]));
        assert!(text.contains("of unbounded"));
        assert!(text.contains("AVG response time: 0."));
    }
}
