//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//!
//! A run is described by [`RunConfig`]. It is loaded once (TOML file, then
//! CLI overrides), validated for its [`Role`], and shared read-only behind an
//! `Arc` by every activity of the session.

pub mod cli;
pub mod toml;
pub mod validator;

use crate::transport::{Endpoint, DEFAULT_RESULT_PORT, DEFAULT_WORK_PORT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Which half of the system this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Distributor and collector
    Control,
    /// Worker pool
    Worker,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Control => write!(f, "control"),
            Role::Worker => write!(f, "worker"),
        }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the two channels live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Control host (workers connect to it, control binds on it)
    #[serde(default = "default_host")]
    pub host: String,
    /// Work channel port
    #[serde(default = "default_work_port")]
    pub work_port: u16,
    /// Result channel port
    #[serde(default = "default_result_port")]
    pub result_port: u16,
    /// Explicit work endpoint, overrides host and port
    #[serde(default)]
    pub work_endpoint: Option<Endpoint>,
    /// Explicit result endpoint, overrides host and port
    #[serde(default)]
    pub result_endpoint: Option<Endpoint>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_work_port() -> u16 {
    DEFAULT_WORK_PORT
}

fn default_result_port() -> u16 {
    DEFAULT_RESULT_PORT
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            work_port: default_work_port(),
            result_port: default_result_port(),
            work_endpoint: None,
            result_endpoint: None,
        }
    }
}

impl NetworkConfig {
    /// Work channel endpoint (distributor address)
    pub fn work_endpoint(&self) -> Endpoint {
        self.work_endpoint
            .clone()
            .unwrap_or_else(|| Endpoint::tcp(&self.host, self.work_port))
    }

    /// Result channel endpoint (collector address)
    pub fn result_endpoint(&self) -> Endpoint {
        self.result_endpoint
            .clone()
            .unwrap_or_else(|| Endpoint::tcp(&self.host, self.result_port))
    }
}

/// Control role settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Tasks to issue; 0 means unbounded
    #[serde(default)]
    pub request_count: u64,
    /// URLs to pick from, uniformly with repeats
    #[serde(default)]
    pub targets: Vec<String>,
    /// Seed for target selection (random when absent)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ControlConfig {
    /// True when the run issues a fixed number of tasks
    pub fn is_bounded(&self) -> bool {
        self.request_count > 0
    }
}

/// Worker role settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Concurrent workers in this process
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_timeout_secs() -> f64 {
    30.0
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WorkerConfig {
    /// Per-request timeout; only meaningful once validated
    pub fn http_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(Duration::from_secs(30))
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Print progress markers and start/stop notices
    #[serde(default = "default_progress")]
    pub progress: bool,
    /// JSON report file (control role)
    #[serde(default)]
    pub json_output: Option<PathBuf>,
}

fn default_progress() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            progress: default_progress(),
            json_output: None,
        }
    }
}

impl RunConfig {
    /// Configuration with both channels on explicit endpoints
    pub fn with_endpoints(work: Endpoint, result: Endpoint) -> Self {
        let mut config = Self::default();
        config.network.work_endpoint = Some(work);
        config.network.result_endpoint = Some(result);
        config
    }
}
