//! Configuration validation
//!
//! Runs before any socket is opened; every error here is fatal.

use super::*;
use crate::engine::http::parse_target;
use anyhow::{Context, Result};

/// Longest accepted per-request timeout (1 day)
const MAX_TIMEOUT_SECS: f64 = 86_400.0;

/// Validate complete configuration for `role`
pub fn validate_config(config: &RunConfig, role: Role) -> Result<()> {
    validate_network(&config.network)?;

    match role {
        Role::Control => validate_control(&config.control)?,
        Role::Worker => validate_worker(&config.worker)?,
    }

    Ok(())
}

/// Validate channel endpoints
pub fn validate_network(network: &NetworkConfig) -> Result<()> {
    let work = network.work_endpoint();
    let result = network.result_endpoint();

    // Round-trip through the parser to catch an empty or malformed host
    for endpoint in [&work, &result] {
        endpoint
            .to_string()
            .parse::<Endpoint>()
            .with_context(|| format!("Invalid endpoint '{}'", endpoint))?;
    }

    if work == result && !is_ephemeral(&work) {
        anyhow::bail!("work and result channels must use different endpoints ({})", work);
    }

    Ok(())
}

fn is_ephemeral(endpoint: &Endpoint) -> bool {
    matches!(endpoint, Endpoint::Tcp(addr) if addr.ends_with(":0"))
}

/// Validate control role settings
pub fn validate_control(control: &ControlConfig) -> Result<()> {
    if control.targets.is_empty() {
        anyhow::bail!("control role needs at least one target URL");
    }

    for (i, target) in control.targets.iter().enumerate() {
        parse_target(target).with_context(|| format!("Target {} is not a valid URL", i))?;
    }

    Ok(())
}

/// Validate worker role settings
pub fn validate_worker(worker: &WorkerConfig) -> Result<()> {
    if worker.workers == 0 {
        anyhow::bail!("worker count must be at least 1");
    }

    if !worker.timeout_secs.is_finite() || worker.timeout_secs <= 0.0 {
        anyhow::bail!("timeout must be greater than 0 (got {})", worker.timeout_secs);
    }
    if worker.timeout_secs > MAX_TIMEOUT_SECS {
        anyhow::bail!(
            "timeout must be at most {} seconds (got {})",
            MAX_TIMEOUT_SECS,
            worker.timeout_secs
        );
    }

    if worker.workers > 1024 {
        tracing::warn!(
            workers = worker.workers,
            "Very high worker count, this may exhaust file descriptors"
        );
    }

    Ok(())
}
