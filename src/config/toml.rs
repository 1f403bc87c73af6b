//! TOML configuration file parsing
//!
//! ```toml
//! [network]
//! host = "10.0.1.10"
//! work_port = 2100
//! result_port = 2101
//!
//! [control]
//! request_count = 1000
//! targets = ["http://localhost/", "http://localhost/test_url2"]
//! seed = 42
//!
//! [worker]
//! workers = 8
//! timeout_secs = 10.0
//!
//! [output]
//! progress = false
//! json_output = "report.json"
//! ```

use super::cli::{Cli, Command};
use super::RunConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<RunConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<RunConfig> {
    let config: RunConfig = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: RunConfig) -> RunConfig {
    // Host is positional, so it always wins
    config.network.host = cli.host().to_string();
    if let Some(port) = cli.work_port {
        config.network.work_port = port;
    }
    if let Some(port) = cli.result_port {
        config.network.result_port = port;
    }

    match &cli.command {
        Command::Control { count, urls, .. } => {
            config.control.request_count = *count;
            config.control.targets = urls.clone();
        }
        Command::Worker { workers, .. } => {
            if let Some(workers) = workers {
                config.worker.workers = *workers;
            }
        }
    }

    if let Some(seed) = cli.seed {
        config.control.seed = Some(seed);
    }
    if let Some(timeout) = cli.timeout {
        config.worker.timeout_secs = timeout;
    }

    if cli.quiet {
        config.output.progress = false;
    }
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }

    config
}

/// Build the run configuration: TOML file if given, then CLI overrides
pub fn load_config(cli: &Cli) -> Result<RunConfig> {
    let base = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => RunConfig::default(),
    };

    Ok(merge_cli_with_config(cli, base))
}
