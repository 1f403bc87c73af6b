//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::Role;

/// httpulse - distributed HTTP load generator
#[derive(Parser, Debug)]
#[command(name = "httpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file (CLI values take precedence)
    #[arg(short = 'c', long, global = true, env = "HTTPULSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Work channel port on the control host
    #[arg(long, global = true)]
    pub work_port: Option<u16>,

    /// Result channel port on the control host
    #[arg(long, global = true)]
    pub result_port: Option<u16>,

    /// Per-request HTTP timeout in seconds (worker role)
    #[arg(long, global = true)]
    pub timeout: Option<f64>,

    /// Seed for target selection (control role)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Suppress progress markers
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Write the final report as JSON (control role)
    #[arg(long, global = true)]
    pub json_output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Distribute tasks to workers and collect their results
    Control {
        /// Host to bind both channels on (workers connect here)
        host: String,

        /// Number of requests to issue (0 = until Ctrl-C)
        count: u64,

        /// URLs to fetch, picked uniformly at random
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
    },

    /// Run a pool of workers against a control host
    Worker {
        /// Control host to connect to
        host: String,

        /// Number of workers (defaults to the number of CPUs)
        workers: Option<usize>,
    },
}

impl Cli {
    pub fn role(&self) -> Role {
        match self.command {
            Command::Control { .. } => Role::Control,
            Command::Worker { .. } => Role::Worker,
        }
    }

    pub fn host(&self) -> &str {
        match &self.command {
            Command::Control { host, .. } | Command::Worker { host, .. } => host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control() {
        let cli = Cli::try_parse_from([
            "httpulse",
            "control",
            "127.0.0.1",
            "30",
            "http://localhost/",
            "http://localhost/test_url2",
        ])
        .unwrap();

        assert_eq!(cli.role(), Role::Control);
        assert_eq!(cli.host(), "127.0.0.1");
        match cli.command {
            Command::Control { count, urls, .. } => {
                assert_eq!(count, 30);
                assert_eq!(urls.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_worker_with_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "httpulse", "worker", "10.0.0.5", "6", "--timeout", "2.5", "--quiet",
        ])
        .unwrap();

        assert_eq!(cli.role(), Role::Worker);
        assert_eq!(cli.timeout, Some(2.5));
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Worker { workers: Some(6), .. }));
    }

    #[test]
    fn test_worker_count_optional() {
        let cli = Cli::try_parse_from(["httpulse", "worker", "ctl"]).unwrap();
        assert!(matches!(cli.command, Command::Worker { workers: None, .. }));
    }

    #[test]
    fn test_control_requires_url() {
        assert!(Cli::try_parse_from(["httpulse", "control", "ctl", "5"]).is_err());
        assert!(Cli::try_parse_from(["httpulse", "control", "ctl", "five", "http://a/"]).is_err());
    }
}
