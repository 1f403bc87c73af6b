//! Control session orchestration
//!
//! [`ControlSession`] owns the control role's transport context. Binding
//! happens up front in [`ControlSession::bind`], so address conflicts fail
//! fast and tests can bind port 0 and read back the real port before any
//! worker starts. [`ControlSession::run`] then drives the distributor and
//! collector as two independent tasks:
//!
//! ```text
//! bind ──► spawn distributor ──┐
//!      └─► spawn collector  ───┴─► wait(collector | shutdown)
//!                                  ──► terminate context ──► join ──► report
//! ```
//!
//! Terminating the context unblocks whichever activity is still waiting on
//! a channel and returns only once every socket of the session is closed.

use super::{collector, distributor};
use crate::config::RunConfig;
use crate::stats::AggregateStats;
use crate::transport::{Context, Endpoint, PullSocket, PushSocket};
use crate::Result;
use anyhow::Context as _;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a control run
#[derive(Debug, Clone)]
pub struct ControlReport {
    /// Collector statistics
    pub stats: AggregateStats,
    /// Tasks the distributor managed to send
    pub tasks_sent: u64,
    /// Configured request count (0 = unbounded)
    pub request_count: u64,
    /// Wall time from start of run to report
    pub elapsed: Duration,
}

impl ControlReport {
    /// True when a bounded run got every result back
    pub fn all_received(&self) -> bool {
        self.request_count > 0 && self.stats.processed() == self.request_count
    }
}

/// Control role: distributor and collector on one context
pub struct ControlSession {
    ctx: Context,
    config: Arc<RunConfig>,
    work: PushSocket,
    results: PullSocket,
}

impl ControlSession {
    /// Create a context and bind both control endpoints
    pub async fn bind(config: Arc<RunConfig>) -> Result<Self> {
        Self::bind_in(Context::new(), config).await
    }

    /// Bind both control endpoints on an existing context
    pub async fn bind_in(ctx: Context, config: Arc<RunConfig>) -> Result<Self> {
        let work_ep = config.network.work_endpoint();
        let result_ep = config.network.result_endpoint();

        let work = ctx
            .bind_push(&work_ep)
            .await
            .with_context(|| format!("Failed to bind work channel on {}", work_ep))?;
        let results = ctx
            .bind_pull(&result_ep)
            .await
            .with_context(|| format!("Failed to bind result channel on {}", result_ep))?;

        tracing::info!(
            work = %work.endpoint(),
            results = %results.endpoint(),
            "Control endpoints bound"
        );

        Ok(Self {
            ctx,
            config,
            work,
            results,
        })
    }

    /// Work channel endpoint actually bound
    pub fn work_endpoint(&self) -> &Endpoint {
        self.work.endpoint()
    }

    /// Result channel endpoint actually bound
    pub fn result_endpoint(&self) -> &Endpoint {
        self.results.endpoint()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Run distributor and collector until all results are in or `shutdown`
    pub async fn run<F>(self, shutdown: F) -> Result<ControlReport>
    where
        F: Future<Output = ()>,
    {
        let ControlSession {
            ctx,
            config,
            work,
            results,
        } = self;
        let start = Instant::now();

        let dist_config = Arc::clone(&config);
        let mut distributor =
            tokio::spawn(async move { distributor::run(&dist_config, work).await });
        let coll_config = Arc::clone(&config);
        let mut collector =
            tokio::spawn(async move { collector::run(&coll_config, results).await });

        let collected = tokio::select! {
            joined = &mut collector => Some(joined),
            _ = shutdown => {
                tracing::info!("Shutdown requested, stopping control session");
                None
            }
        };

        // Unblocks the distributor if it still waits for a worker, and the
        // collector if shutdown came first
        ctx.terminate().await;

        let stats = match collected {
            Some(joined) => joined,
            None => (&mut collector).await,
        }
        .context("Collector task panicked")??;

        let tasks_sent = match (&mut distributor).await.context("Distributor task panicked")? {
            Ok(sent) => sent,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "Distributor failed");
                0
            }
        };

        Ok(ControlReport {
            stats,
            tasks_sent,
            request_count: config.control.request_count,
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::WorkerPool;
    use crate::engine::mock::{MockEngine, MockResponse};
    use crate::engine::FetchEngine;

    fn inproc_config(count: u64, workers: usize) -> Arc<RunConfig> {
        let mut config =
            RunConfig::with_endpoints(Endpoint::inproc("work"), Endpoint::inproc("results"));
        config.control.request_count = count;
        config.control.targets = vec!["A".to_string()];
        config.control.seed = Some(3);
        config.worker.workers = workers;
        config.output.progress = false;
        Arc::new(config)
    }

    /// Control and worker pool sharing one in-process context
    async fn run_inproc(count: u64, workers: usize, engine: Arc<dyn FetchEngine>) -> ControlReport {
        let ctx = Context::new();
        let config = inproc_config(count, workers);

        let session = ControlSession::bind_in(ctx.clone(), Arc::clone(&config)).await.unwrap();
        let pool = WorkerPool::with_context(ctx.clone(), config, engine);

        let pool_handle = tokio::spawn(pool.run(std::future::pending()));

        // In-process peers must connect while the control endpoints are bound
        let expected = 2 + 2 * workers;
        while ctx.open_sockets() < expected {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let report = session.run(std::future::pending()).await.unwrap();

        pool_handle.await.unwrap().unwrap();
        assert_eq!(ctx.open_sockets(), 0);
        report
    }

    #[tokio::test]
    async fn test_always_ok_scenario() {
        let engine = MockEngine::always(200, Duration::from_millis(5));
        let report = run_inproc(10, 4, Arc::new(engine.clone())).await;

        assert!(report.all_received());
        assert_eq!(report.tasks_sent, 10);
        assert_eq!(report.stats.processed(), 10);
        assert_eq!(report.stats.mean_latency(), Duration::from_millis(5));
        assert_eq!(report.stats.http_error_count(), 0);
        assert!(engine.targets_fetched().iter().all(|t| t == "A"));
    }

    #[tokio::test]
    async fn test_alternating_failure_scenario() {
        let engine = MockEngine::from_script(vec![
            MockResponse::status(200, Duration::from_millis(5)),
            MockResponse::fail("connection refused"),
        ]);
        let report = run_inproc(4, 2, Arc::new(engine)).await;

        assert_eq!(report.stats.processed(), 4);
        assert_eq!(report.stats.http_error_count(), 0);
        assert_eq!(report.stats.failure_count(), 2);
    }

    #[tokio::test]
    async fn test_worker_count_does_not_change_totals() {
        let script = vec![
            MockResponse::status(200, Duration::from_millis(1)),
            MockResponse::status(503, Duration::from_millis(1)),
            MockResponse::status(404, Duration::from_millis(1)),
        ];

        let one = run_inproc(30, 1, Arc::new(MockEngine::from_script(script.clone()))).await;
        let eight = run_inproc(30, 8, Arc::new(MockEngine::from_script(script))).await;

        assert_eq!(one.stats.processed(), 30);
        assert_eq!(eight.stats.processed(), 30);
        assert_eq!(one.stats.http_error_count(), 20);
        assert_eq!(eight.stats.http_error_count(), 20);
    }

    #[tokio::test]
    async fn test_shutdown_with_no_workers() {
        let config = inproc_config(5, 1);
        let session = ControlSession::bind(config).await.unwrap();
        let ctx = session.context().clone();

        let report = session
            .run(tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        // Inproc buffers tasks, but nothing ever answers
        assert_eq!(report.stats.processed(), 0);
        assert!(!report.all_received());
        assert_eq!(ctx.open_sockets(), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_tcp() {
        let mut config = RunConfig::with_endpoints(
            Endpoint::tcp("127.0.0.1", 0),
            Endpoint::tcp("127.0.0.1", 0),
        );
        config.control.request_count = 25;
        config.control.targets = vec!["http://a/".to_string(), "http://b/".to_string()];
        config.output.progress = false;
        let config = Arc::new(config);

        let session = ControlSession::bind(Arc::clone(&config)).await.unwrap();

        // Workers get the ports the OS actually picked
        let mut worker_config = (*config).clone();
        worker_config.network.work_endpoint = Some(session.work_endpoint().clone());
        worker_config.network.result_endpoint = Some(session.result_endpoint().clone());
        worker_config.worker.workers = 3;

        let engine = MockEngine::always(200, Duration::from_millis(2));
        let pool = WorkerPool::new(Arc::new(worker_config), Arc::new(engine.clone()));
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let pool_handle = tokio::spawn(pool.run(async move {
            let _ = stop_rx.await;
        }));

        let report = tokio::time::timeout(Duration::from_secs(10), session.run(std::future::pending()))
            .await
            .expect("control run timed out")
            .unwrap();

        assert!(report.all_received());
        assert_eq!(report.tasks_sent, 25);
        assert_eq!(report.stats.processed(), 25);
        assert_eq!(report.stats.http_error_count(), 0);

        stop_tx.send(()).unwrap();
        let handled = pool_handle.await.unwrap().unwrap();
        assert_eq!(handled.iter().sum::<u64>(), 25);
        assert_eq!(engine.call_count(), 25);
    }
}
