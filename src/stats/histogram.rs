//! Latency histogram using HdrHistogram
//!
//! Wraps HdrHistogram for recording request latencies with constant-time
//! recording and percentile queries.
//!
//! # Example
//!
//! ```
//! use httpulse::stats::histogram::LatencyHistogram;
//! use std::time::Duration;
//!
//! let mut hist = LatencyHistogram::new();
//! hist.record(Duration::from_millis(12));
//! hist.record(Duration::from_millis(40));
//!
//! let p50 = hist.percentile(50.0);
//! assert!(p50.is_some());
//! ```

use hdrhistogram::Histogram;
use std::time::Duration;

/// Largest trackable latency: 1 hour in microseconds
const MAX_LATENCY_US: u64 = 3_600_000_000;

/// Latency histogram wrapper
///
/// Tracks latencies from 1µs to 1 hour with 3 significant digits (values
/// accurate to within 0.1%). HTTP latencies never need nanosecond resolution,
/// so samples are stored in microseconds.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, MAX_LATENCY_US, 3)
            .expect("Failed to create histogram with valid bounds");

        Self { histogram }
    }

    /// Record a latency sample, clamped into the trackable range
    #[inline]
    pub fn record(&mut self, latency: Duration) {
        let micros = latency.as_micros().min(MAX_LATENCY_US as u128) as u64;
        let _ = self.histogram.record(micros.max(1));
    }

    /// Latency at `percentile` (0.0 - 100.0), or None if empty
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.value_at_percentile(percentile)))
    }

    pub fn min(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.min()))
    }

    pub fn max(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.max()))
    }

    /// Number of samples recorded
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}
