//! JSON output formatting
//!
//! Serializes the control report with serde_json. Durations carry both
//! microseconds and a human-readable form, as in the text report.

use super::{format_duration_human, rate_per_sec};
use crate::distributed::ControlReport;
use crate::stats::histogram::LatencyHistogram;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        Self {
            micros: d.as_micros() as u64,
            human: format_duration_human(d),
        }
    }
}

/// Latency statistics with percentiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLatency {
    pub mean: JsonDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p50: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p90: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<JsonDuration>,
}

/// Complete report file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub tool: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// 0 when the run was unbounded
    pub request_count: u64,
    pub tasks_sent: u64,
    pub processed: u64,
    pub all_received: bool,
    pub http_errors: u64,
    pub failures: u64,
    pub elapsed: JsonDuration,
    pub requests_per_sec: f64,
    pub latency: JsonLatency,
    pub status_codes: BTreeMap<u16, u64>,
    pub per_worker: BTreeMap<u32, u64>,
}

fn extract_latency(mean: Duration, hist: &LatencyHistogram) -> JsonLatency {
    JsonLatency {
        mean: JsonDuration::from_duration(mean),
        min: hist.min().map(JsonDuration::from_duration),
        p50: hist.percentile(50.0).map(JsonDuration::from_duration),
        p90: hist.percentile(90.0).map(JsonDuration::from_duration),
        p99: hist.percentile(99.0).map(JsonDuration::from_duration),
        max: hist.max().map(JsonDuration::from_duration),
    }
}

/// Build the serializable form of a report
pub fn build_json_report(report: &ControlReport) -> JsonReport {
    let stats = &report.stats;

    JsonReport {
        tool: "httpulse".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        request_count: report.request_count,
        tasks_sent: report.tasks_sent,
        processed: stats.processed(),
        all_received: report.all_received(),
        http_errors: stats.http_error_count(),
        failures: stats.failure_count(),
        elapsed: JsonDuration::from_duration(report.elapsed),
        requests_per_sec: rate_per_sec(stats.processed(), report.elapsed),
        latency: extract_latency(stats.mean_latency(), stats.histogram()),
        status_codes: stats.status_counts().clone(),
        per_worker: stats.per_worker().clone(),
    }
}

/// Write the report as pretty JSON to `path`
pub fn write_json_report(path: &Path, report: &ControlReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON output file: {}", path.display()))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &build_json_report(report))
        .with_context(|| format!("Failed to write JSON output: {}", path.display()))?;
    writer.flush()?;

    Ok(())
}
