//! HTTP fetch engine
//!
//! Issues a GET per task with a shared `reqwest::Client` (connection pooling
//! across all workers of the pool) and reads the full body, so the measured
//! latency covers the whole response.

use super::{FetchEngine, FetchResponse};
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::{Duration, Instant};

/// reqwest-backed fetch engine
pub struct HttpEngine {
    client: Client,
}

impl HttpEngine {
    /// Create an engine with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("httpulse/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

/// Parse a target into a URL the client accepts
pub fn parse_target(target: &str) -> Result<Url, FetchError> {
    let url = Url::parse(target).map_err(|e| FetchError::InvalidTarget {
        target: target.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidTarget {
            target: target.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

#[async_trait]
impl FetchEngine for HttpEngine {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, target: &str) -> Result<FetchResponse, FetchError> {
        let url = parse_target(target)?;

        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status_code = response.status().as_u16();
        response.bytes().await?;
        let latency = start.elapsed();

        Ok(FetchResponse { status_code, latency })
    }
}
