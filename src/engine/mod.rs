//! Fetch engine abstraction
//!
//! A fetch engine executes one unit of work: fetch a target and report the
//! status code and how long it took. Workers are agnostic to the engine, so
//! the real HTTP client can be swapped for a deterministic stand-in in tests.
//!
//! # Engines
//!
//! - **http**: `reqwest` GET, body fully read before the clock stops
//! - **mock**: scripted responses and failures, no network
//!
//! # Error Handling
//!
//! `fetch` returns [`FetchError`] for anything that prevented a response
//! (invalid URL, connection refused, timeout). An HTTP error status is *not*
//! an error at this level; it is a response like any other and the collector
//! classifies it.

pub mod http;
pub mod mock;

use crate::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;

/// Outcome of a fetch that produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code (0 when the exchange never produced one)
    pub status_code: u16,
    /// Time from request start to end of response body
    pub latency: Duration,
}

/// Unit-of-work executor shared by all workers of a pool
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Fetch `target` once
    async fn fetch(&self, target: &str) -> Result<FetchResponse, FetchError>;
}
