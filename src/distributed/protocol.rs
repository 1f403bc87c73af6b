//! Work item codec
//!
//! Tasks and results travel as MessagePack maps (rmp-serde, named fields) so
//! any language with a MessagePack library can talk to httpulse.
//!
//! # Payloads
//!
//! ```text
//! Task:            { url }
//! Result, success: { url, worker_id, status: "success", runtime, http_status }
//! Result, error:   { url, worker_id, status: "error", message }
//! ```
//!
//! `runtime` is the request latency in seconds (f64).
//!
//! On the wire a result is a flat map with optional fields. In memory it is
//! a [`ResultDescriptor`] whose [`Outcome`] makes "latency and status iff
//! success, message iff error" impossible to violate.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One unit of work: fetch `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    #[serde(rename = "url")]
    pub target: String,
}

impl TaskDescriptor {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into() }
    }
}

/// Result of executing one task
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDescriptor {
    pub target: String,
    pub worker_id: u32,
    pub outcome: Outcome,
}

/// How a task ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A response arrived
    Success { latency: Duration, status_code: u16 },
    /// The fetch failed before producing a response
    Failure { error_message: String },
}

impl ResultDescriptor {
    pub fn success(target: impl Into<String>, worker_id: u32, latency: Duration, status_code: u16) -> Self {
        Self {
            target: target.into(),
            worker_id,
            outcome: Outcome::Success { latency, status_code },
        }
    }

    pub fn failure(target: impl Into<String>, worker_id: u32, error_message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            worker_id,
            outcome: Outcome::Failure {
                error_message: error_message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireStatus {
    Success,
    Error,
}

/// Flat wire shape of a result
#[derive(Debug, Serialize, Deserialize)]
struct WireResult {
    url: String,
    worker_id: u32,
    status: WireStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    runtime: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<&ResultDescriptor> for WireResult {
    fn from(result: &ResultDescriptor) -> Self {
        let mut wire = WireResult {
            url: result.target.clone(),
            worker_id: result.worker_id,
            status: WireStatus::Success,
            runtime: None,
            http_status: None,
            message: None,
        };
        match &result.outcome {
            Outcome::Success { latency, status_code } => {
                wire.runtime = Some(latency.as_secs_f64());
                wire.http_status = Some(*status_code);
            }
            Outcome::Failure { error_message } => {
                wire.status = WireStatus::Error;
                wire.message = Some(error_message.clone());
            }
        }
        wire
    }
}

impl TryFrom<WireResult> for ResultDescriptor {
    type Error = anyhow::Error;

    fn try_from(wire: WireResult) -> Result<Self> {
        let outcome = match wire.status {
            WireStatus::Success => {
                let runtime = wire.runtime.context("success result without runtime")?;
                let status_code = wire.http_status.context("success result without http_status")?;
                let latency = Duration::try_from_secs_f64(runtime)
                    .with_context(|| format!("invalid runtime {}", runtime))?;
                Outcome::Success { latency, status_code }
            }
            WireStatus::Error => Outcome::Failure {
                error_message: wire.message.context("error result without message")?,
            },
        };

        Ok(ResultDescriptor {
            target: wire.url,
            worker_id: wire.worker_id,
            outcome,
        })
    }
}

/// Encode a task payload
pub fn encode_task(task: &TaskDescriptor) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(task).context("Failed to serialize task")
}

/// Decode a task payload
pub fn decode_task(payload: &[u8]) -> Result<TaskDescriptor> {
    rmp_serde::from_slice(payload).context("Failed to deserialize task")
}

/// Encode a result payload
pub fn encode_result(result: &ResultDescriptor) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(&WireResult::from(result)).context("Failed to serialize result")
}

/// Decode a result payload
pub fn decode_result(payload: &[u8]) -> Result<ResultDescriptor> {
    let wire: WireResult = rmp_serde::from_slice(payload).context("Failed to deserialize result")?;
    ResultDescriptor::try_from(wire)
}
