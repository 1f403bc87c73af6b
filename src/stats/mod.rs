//! Result statistics
//!
//! [`AggregateStats`] is owned by the collector and mutated by nothing else.
//! It counts every result, sums success latencies for the mean, feeds a
//! latency histogram for percentiles, and classifies HTTP error statuses and
//! failures separately.
//!
//! # Example
//!
//! ```
//! use httpulse::distributed::protocol::ResultDescriptor;
//! use httpulse::stats::{AggregateStats, Classification};
//! use std::time::Duration;
//!
//! let mut stats = AggregateStats::new();
//! let ok = ResultDescriptor::success("http://a/", 0, Duration::from_millis(5), 200);
//! assert_eq!(stats.record(&ok), Classification::Ok);
//!
//! let bad = ResultDescriptor::success("http://a/", 0, Duration::from_millis(5), 503);
//! assert_eq!(stats.record(&bad), Classification::HttpError(503));
//!
//! assert_eq!(stats.processed(), 2);
//! assert_eq!(stats.http_error_count(), 1);
//! ```

pub mod histogram;

use crate::distributed::protocol::{Outcome, ResultDescriptor};
use histogram::LatencyHistogram;
use std::collections::BTreeMap;
use std::time::Duration;

/// How the collector classified one result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Response with a non-error status
    Ok,
    /// Response with status 0 or >= 400
    HttpError(u16),
    /// Fetch failed, or the payload could not be decoded
    Failure,
}

/// Status 0 means no usable status line; 4xx/5xx are errors
#[inline]
pub fn is_http_error(status_code: u16) -> bool {
    status_code == 0 || status_code >= 400
}

/// Collector statistics
#[derive(Debug, Clone, Default)]
pub struct AggregateStats {
    processed: u64,
    latency_sum: Duration,
    http_error_count: u64,
    failure_count: u64,
    histogram: LatencyHistogram,
    per_worker: BTreeMap<u32, u64>,
    status_counts: BTreeMap<u16, u64>,
}

impl AggregateStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one decoded result
    pub fn record(&mut self, result: &ResultDescriptor) -> Classification {
        self.processed += 1;
        *self.per_worker.entry(result.worker_id).or_insert(0) += 1;

        match &result.outcome {
            Outcome::Success { latency, status_code } => {
                self.latency_sum += *latency;
                self.histogram.record(*latency);
                *self.status_counts.entry(*status_code).or_insert(0) += 1;

                if is_http_error(*status_code) {
                    self.http_error_count += 1;
                    Classification::HttpError(*status_code)
                } else {
                    Classification::Ok
                }
            }
            Outcome::Failure { .. } => {
                self.failure_count += 1;
                Classification::Failure
            }
        }
    }

    /// Account for a payload that could not be decoded
    pub fn record_undecodable(&mut self) -> Classification {
        self.processed += 1;
        self.failure_count += 1;
        Classification::Failure
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn latency_sum(&self) -> Duration {
        self.latency_sum
    }

    pub fn http_error_count(&self) -> u64 {
        self.http_error_count
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    /// Successful responses, error statuses included
    pub fn response_count(&self) -> u64 {
        self.histogram.len()
    }

    /// Latency sum divided by every processed result (failures included)
    pub fn mean_latency(&self) -> Duration {
        if self.processed == 0 {
            return Duration::ZERO;
        }
        let nanos = self.latency_sum.as_nanos() / u128::from(self.processed);
        Duration::from_nanos(nanos.min(u128::from(u64::MAX)) as u64)
    }

    pub fn histogram(&self) -> &LatencyHistogram {
        &self.histogram
    }

    /// Results per worker id
    pub fn per_worker(&self) -> &BTreeMap<u32, u64> {
        &self.per_worker
    }

    /// Responses per HTTP status code
    pub fn status_counts(&self) -> &BTreeMap<u16, u64> {
        &self.status_counts
    }
}
