//! Result collector
//!
//! Consumes results from the result channel and folds them into
//! [`AggregateStats`]. Completion is decided by counting alone: a bounded run
//! ends when `processed == request_count`, since every task yields exactly
//! one result. An unbounded run ends only when the channel reports `Closed`.
//!
//! Per result the collector prints a `.` marker; an HTTP error status also
//! prints a diagnostic line, and a failure is echoed to stderr.

use super::protocol::{decode_result, Outcome, ResultDescriptor};
use crate::config::RunConfig;
use crate::error::ChannelError;
use crate::output::progress_marker;
use crate::stats::{AggregateStats, Classification};
use crate::transport::MessageSource;
use crate::Result;

/// Marker printed per result received
const RESULT_MARKER: char = '.';

/// Collect results until all are in or the channel closes
///
/// Takes ownership of `source`; it is closed when this returns.
pub async fn run<S>(config: &RunConfig, mut source: S) -> Result<AggregateStats>
where
    S: MessageSource,
{
    let bound = config.control.request_count;
    let progress = config.output.progress;
    let mut stats = AggregateStats::new();

    if progress {
        println!("Collector Started");
    }
    tracing::debug!(request_count = bound, "Collector started");

    while bound == 0 || stats.processed() < bound {
        let payload = match source.recv().await {
            Ok(payload) => payload,
            Err(ChannelError::Closed) => {
                tracing::debug!(processed = stats.processed(), "Result channel closed");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to receive result");
                continue;
            }
        };

        match decode_result(&payload) {
            Ok(result) => {
                let class = stats.record(&result);
                report_result(&result, class, progress);
            }
            Err(e) => {
                stats.record_undecodable();
                eprintln!("Undecodable result: {:#}", e);
            }
        }
    }

    tracing::debug!(
        processed = stats.processed(),
        http_errors = stats.http_error_count(),
        failures = stats.failure_count(),
        "Collector finished"
    );
    Ok(stats)
}

fn report_result(result: &ResultDescriptor, class: Classification, progress: bool) {
    match (&result.outcome, class) {
        (Outcome::Failure { error_message }, _) => {
            eprintln!("{} ({})", error_message, result.target);
        }
        (Outcome::Success { .. }, Classification::HttpError(status)) => {
            if progress {
                progress_marker(RESULT_MARKER);
            }
            println!(
                "HTTP Error: {} {} (worker {})",
                status, result.target, result.worker_id
            );
        }
        (Outcome::Success { .. }, _) => {
            if progress {
                progress_marker(RESULT_MARKER);
            }
        }
    }
}
