//! Mock fetch engine for testing
//!
//! Replays a script of responses without touching the network, which makes
//! worker and session tests fast and deterministic.
//!
//! # Features
//!
//! - Scripted outcomes, cycled by global call index (not by worker), so the
//!   totals over N calls do not depend on how many workers share the engine
//! - Optional simulated delay per call
//! - Call counting and per-target history for verification
//!
//! # Example
//!
//! ```
//! use httpulse::engine::mock::{MockEngine, MockResponse};
//! use std::time::Duration;
//!
//! let engine = MockEngine::from_script(vec![
//!     MockResponse::status(200, Duration::from_millis(5)),
//!     MockResponse::fail("connection refused"),
//! ]);
//! assert_eq!(engine.call_count(), 0);
//! ```

use super::{FetchEngine, FetchResponse};
use crate::error::FetchError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One scripted outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Respond with a status code after reporting this latency
    Status { status_code: u16, latency: Duration },
    /// Fail with this message
    Fail(String),
}

impl MockResponse {
    pub fn status(status_code: u16, latency: Duration) -> Self {
        MockResponse::Status { status_code, latency }
    }

    pub fn fail(message: &str) -> Self {
        MockResponse::Fail(message.to_string())
    }
}

/// Mock fetch engine
///
/// Cheap to clone; clones share the call counter and history.
#[derive(Clone)]
pub struct MockEngine {
    /// Outcomes, cycled by call index
    script: Arc<Vec<MockResponse>>,

    /// Real time spent in each call
    delay: Duration,

    /// Calls made so far
    calls: Arc<AtomicUsize>,

    /// Targets requested, in call order
    history: Arc<Mutex<Vec<String>>>,
}

impl MockEngine {
    /// Always answer with the same status and latency
    pub fn always(status_code: u16, latency: Duration) -> Self {
        Self::from_script(vec![MockResponse::status(status_code, latency)])
    }

    /// Cycle through `script`; an empty script answers 200 in 0s
    pub fn from_script(script: Vec<MockResponse>) -> Self {
        let script = if script.is_empty() {
            vec![MockResponse::status(200, Duration::ZERO)]
        } else {
            script
        };

        Self {
            script: Arc::new(script),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleep this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of fetches performed
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Targets fetched so far
    pub fn targets_fetched(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl FetchEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, target: &str) -> Result<FetchResponse, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.script[call % self.script.len()] {
            MockResponse::Status { status_code, latency } => Ok(FetchResponse {
                status_code: *status_code,
                latency: *latency,
            }),
            MockResponse::Fail(message) => Err(FetchError::Mock(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always() {
        let engine = MockEngine::always(200, Duration::from_millis(5));
        for _ in 0..3 {
            let response = engine.fetch("A").await.unwrap();
            assert_eq!(response.status_code, 200);
            assert_eq!(response.latency, Duration::from_millis(5));
        }
        assert_eq!(engine.call_count(), 3);
        assert_eq!(engine.targets_fetched(), vec!["A", "A", "A"]);
    }

    #[tokio::test]
    async fn test_script_cycles_across_clones() {
        let engine = MockEngine::from_script(vec![
            MockResponse::status(200, Duration::from_millis(1)),
            MockResponse::fail("refused"),
        ]);
        let other = engine.clone();

        assert!(engine.fetch("a").await.is_ok());
        let err = other.fetch("b").await.unwrap_err();
        assert_eq!(err.to_string(), "refused");
        assert!(engine.fetch("c").await.is_ok());
        assert_eq!(other.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_defaults_to_ok() {
        let engine = MockEngine::from_script(Vec::new());
        assert_eq!(engine.fetch("x").await.unwrap().status_code, 200);
    }
}
