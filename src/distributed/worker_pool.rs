//! Worker pool manager
//!
//! Runs the worker role: `workers` concurrent [`Worker`]s, each with its own
//! pull socket on the work channel and push socket on the result channel.
//! Connected sockets dial in the background and redial when the control
//! process goes away, so the pool may start before control and survives
//! control restarts.
//!
//! There is no shutdown protocol with control. The pool runs until the
//! caller's shutdown future resolves (Ctrl-C) or its context is terminated,
//! then terminates the context, which unblocks every worker (including one
//! in the middle of a fetch), and joins them.

use crate::config::RunConfig;
use crate::engine::FetchEngine;
use crate::transport::Context;
use crate::worker::Worker;
use crate::Result;
use anyhow::Context as _;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Pool of workers sharing one transport context
pub struct WorkerPool {
    ctx: Context,
    config: Arc<RunConfig>,
    engine: Arc<dyn FetchEngine>,
    node_id: String,
}

impl WorkerPool {
    /// Create a pool with its own context
    pub fn new(config: Arc<RunConfig>, engine: Arc<dyn FetchEngine>) -> Self {
        Self::with_context(Context::new(), config, engine)
    }

    /// Create a pool on an existing context (in-process sessions)
    pub fn with_context(ctx: Context, config: Arc<RunConfig>, engine: Arc<dyn FetchEngine>) -> Self {
        Self {
            ctx,
            config,
            engine,
            node_id: get_node_id(),
        }
    }

    /// Run all workers until `shutdown` resolves or the context terminates
    ///
    /// Returns the number of tasks handled per worker, indexed by worker id.
    pub async fn run<F>(self, shutdown: F) -> Result<Vec<u64>>
    where
        F: Future<Output = ()>,
    {
        let worker_count = self.config.worker.workers;
        let work = self.config.network.work_endpoint();
        let results = self.config.network.result_endpoint();
        let progress = self.config.output.progress;

        tracing::info!(
            node = %self.node_id,
            workers = worker_count,
            engine = self.engine.name(),
            work = %work,
            results = %results,
            "Starting worker pool"
        );

        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            let id = u32::try_from(id).context("worker id out of range")?;

            // Sockets are created here so a failure surfaces before any
            // worker runs; they move into the worker task and close with it
            let mut tasks = self
                .ctx
                .connect_pull(&work)
                .await
                .with_context(|| format!("Worker {} failed to connect to {}", id, work))?;
            let mut sink = self
                .ctx
                .connect_push(&results)
                .await
                .with_context(|| format!("Worker {} failed to connect to {}", id, results))?;

            let worker = Worker::new(id, Arc::clone(&self.engine))
                .with_progress(progress)
                .with_cancellation(self.ctx.clone());
            workers.spawn(async move {
                if progress {
                    println!("Started Worker {}", worker.id());
                }
                let handled = worker.run(&mut tasks, &mut sink).await;
                if progress {
                    println!("Stopped Worker {}", worker.id());
                }
                (worker.id(), handled)
            });
        }

        tokio::select! {
            _ = shutdown => tracing::info!(node = %self.node_id, "Shutdown requested"),
            _ = self.ctx.terminated() => tracing::debug!("Context terminated"),
        }

        // Unblocks every send/recv, then waits for all sockets to close
        self.ctx.terminate().await;

        let mut handled = vec![0u64; worker_count];
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((id, Ok(count))) => handled[id as usize] = count,
                Ok((id, Err(e))) => tracing::warn!(worker_id = id, error = %e, "Worker failed"),
                Err(e) => tracing::warn!(error = %e, "Worker task panicked"),
            }
        }

        tracing::info!(
            node = %self.node_id,
            handled = handled.iter().sum::<u64>(),
            "Worker pool stopped"
        );
        Ok(handled)
    }
}

/// Node identifier for logs (hostname, or "unknown")
fn get_node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::protocol::{decode_result, encode_task, TaskDescriptor};
    use crate::engine::mock::MockEngine;
    use crate::transport::{Endpoint, MessageSink, MessageSource};
    use std::time::Duration;

    fn config(workers: usize) -> Arc<RunConfig> {
        let mut config = RunConfig::with_endpoints(Endpoint::inproc("work"), Endpoint::inproc("results"));
        config.worker.workers = workers;
        config.output.progress = false;
        Arc::new(config)
    }

    #[tokio::test]
    async fn test_pool_handles_tasks_until_shutdown() {
        let ctx = Context::new();
        let mut distributor = ctx.bind_push(&Endpoint::inproc("work")).await.unwrap();
        let mut collector = ctx.bind_pull(&Endpoint::inproc("results")).await.unwrap();

        let engine = MockEngine::always(200, Duration::from_millis(1));
        let pool = WorkerPool::with_context(ctx.clone(), config(3), Arc::new(engine.clone()));

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(pool.run(async move {
            let _ = stop_rx.await;
        }));

        for i in 0..9 {
            let task = TaskDescriptor::new(format!("http://host/{}", i));
            distributor.send(encode_task(&task).unwrap()).await.unwrap();
        }
        for _ in 0..9 {
            let result = decode_result(&collector.recv().await.unwrap()).unwrap();
            assert!(result.is_success());
            assert!(result.worker_id < 3);
        }

        drop(distributor);
        drop(collector);
        stop_tx.send(()).unwrap();

        let handled = handle.await.unwrap().unwrap();
        assert_eq!(handled.len(), 3);
        assert_eq!(handled.iter().sum::<u64>(), 9);
        assert_eq!(engine.call_count(), 9);
        assert!(ctx.is_terminated());
        assert_eq!(ctx.open_sockets(), 0);
    }

    #[tokio::test]
    async fn test_pool_stops_when_context_terminated() {
        let ctx = Context::new();
        let distributor = ctx.bind_push(&Endpoint::inproc("work")).await.unwrap();
        let collector = ctx.bind_pull(&Endpoint::inproc("results")).await.unwrap();

        let engine = MockEngine::always(200, Duration::ZERO);
        let pool = WorkerPool::with_context(ctx.clone(), config(2), Arc::new(engine));
        let handle = tokio::spawn(pool.run(std::future::pending()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        distributor.close();
        collector.close();
        ctx.terminate().await;

        let handled = handle.await.unwrap().unwrap();
        assert_eq!(handled, vec![0, 0]);
    }

    #[tokio::test]
    async fn test_shutdown_does_not_wait_for_inflight_fetch() {
        let ctx = Context::new();
        let mut distributor = ctx.bind_push(&Endpoint::inproc("work")).await.unwrap();
        let collector = ctx.bind_pull(&Endpoint::inproc("results")).await.unwrap();

        let engine = MockEngine::always(200, Duration::ZERO).with_delay(Duration::from_secs(5));
        let pool = WorkerPool::with_context(ctx.clone(), config(1), Arc::new(engine.clone()));

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(pool.run(async move {
            let _ = stop_rx.await;
        }));

        let task = TaskDescriptor::new("http://slow/");
        distributor.send(encode_task(&task).unwrap()).await.unwrap();
        while engine.call_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;

        drop(distributor);
        drop(collector);
        let started = std::time::Instant::now();
        stop_tx.send(()).unwrap();

        let handled = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("pool shutdown waited on the fetch")
            .unwrap()
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(handled, vec![0]);
        assert_eq!(ctx.open_sockets(), 0);
    }

    #[tokio::test]
    async fn test_connect_to_unbound_inproc_fails() {
        let engine = MockEngine::always(200, Duration::ZERO);
        let pool = WorkerPool::new(config(1), Arc::new(engine));
        assert!(pool.run(std::future::pending()).await.is_err());
    }
}
