//! httpulse CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use httpulse::config::cli::Cli;
use httpulse::config::toml::load_config;
use httpulse::config::validator::validate_config;
use httpulse::config::{Role, RunConfig};
use httpulse::distributed::{ControlSession, WorkerPool};
use httpulse::engine::http::HttpEngine;
use httpulse::output::{json::write_json_report, text::print_report};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let role = cli.role();

    // Everything is checked before a socket is opened
    let config = load_config(&cli)?;
    validate_config(&config, role).context("Configuration validation failed")?;
    let config = Arc::new(config);

    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        match role {
            Role::Control => run_control(config).await,
            Role::Worker => run_worker(config).await,
        }
    })
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("httpulse=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn run_control(config: Arc<RunConfig>) -> Result<()> {
    let session = ControlSession::bind(Arc::clone(&config)).await?;
    let report = session.run(ctrl_c()).await?;

    print_report(&report);

    if let Some(path) = &config.output.json_output {
        write_json_report(path, &report)?;
        println!("JSON report written to {}", path.display());
    }

    Ok(())
}

async fn run_worker(config: Arc<RunConfig>) -> Result<()> {
    let engine = HttpEngine::new(config.worker.http_timeout())
        .context("Failed to create HTTP client")?;

    let pool = WorkerPool::new(Arc::clone(&config), Arc::new(engine));
    let handled = pool.run(ctrl_c()).await?;

    if config.output.progress {
        println!();
        println!("Handled {} tasks", handled.iter().sum::<u64>());
    }

    Ok(())
}
