//! Worker implementation
//!
//! A worker is the execution unit of the worker role. It pulls tasks from the
//! work channel, runs the fetch engine on each, and pushes one result per
//! task onto the result channel.
//!
//! # Failure Handling
//!
//! A fetch error never ends the worker. It becomes a failure result carrying
//! `P<worker_id> Error: '<text>'`. A task payload that cannot be decoded
//! becomes a failure result with an empty target. Both are sent like any
//! other result.
//!
//! The loop ends only when a channel reports
//! [`ChannelError::Closed`](crate::error::ChannelError::Closed), i.e.
//! the session context was terminated. A worker given its context through
//! [`Worker::with_cancellation`] also abandons an in-flight fetch the moment
//! the context terminates, so shutdown never waits on a slow target.
//!
//! # Example
//!
//! ```no_run
//! use httpulse::engine::mock::MockEngine;
//! use httpulse::transport::{Context, Endpoint};
//! use httpulse::worker::Worker;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let ctx = Context::new();
//! let mut tasks = ctx.connect_pull(&"tcp://127.0.0.1:2100".parse::<Endpoint>()?).await?;
//! let mut results = ctx.connect_push(&"tcp://127.0.0.1:2101".parse::<Endpoint>()?).await?;
//!
//! let worker = Worker::new(0, Arc::new(MockEngine::always(200, Duration::from_millis(5))));
//! let handled = worker.run(&mut tasks, &mut results).await?;
//! println!("Handled {} tasks", handled);
//! # Ok(())
//! # }
//! ```

use crate::distributed::protocol::{decode_task, encode_result, ResultDescriptor};
use crate::engine::FetchEngine;
use crate::output::progress_marker;
use crate::transport::{Context, MessageSink, MessageSource};
use crate::Result;
use std::sync::Arc;

/// Marker printed per task handled
const TASK_MARKER: char = '.';

/// Worker
pub struct Worker {
    /// Worker ID (unique within the pool)
    id: u32,

    /// Fetch engine, shared by the whole pool
    engine: Arc<dyn FetchEngine>,

    /// Print a marker per task
    progress: bool,

    /// Context whose termination cuts a pending fetch short
    cancel: Option<Context>,
}

impl Worker {
    pub fn new(id: u32, engine: Arc<dyn FetchEngine>) -> Self {
        Self {
            id,
            engine,
            progress: false,
            cancel: None,
        }
    }

    /// Enable or disable per-task progress markers
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Abandon the in-flight fetch once `ctx` is terminated
    pub fn with_cancellation(mut self, ctx: Context) -> Self {
        self.cancel = Some(ctx);
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Pull, execute, push until a channel is closed
    ///
    /// Returns the number of tasks handled.
    pub async fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<u64>
    where
        S: MessageSource + ?Sized,
        K: MessageSink + ?Sized,
    {
        let mut handled = 0u64;

        loop {
            let payload = match source.recv().await {
                Ok(payload) => payload,
                Err(e) if e.is_closed() => break,
                Err(e) => {
                    tracing::warn!(worker_id = self.id, error = %e, "Failed to receive task");
                    continue;
                }
            };

            if self.progress {
                progress_marker(TASK_MARKER);
            }

            let result = match &self.cancel {
                Some(ctx) => tokio::select! {
                    biased;
                    _ = ctx.terminated() => {
                        tracing::debug!(worker_id = self.id, "Context terminated, fetch abandoned");
                        break;
                    }
                    result = self.execute(&payload) => result,
                },
                None => self.execute(&payload).await,
            };
            handled += 1;

            let encoded = match encode_result(&result) {
                Ok(encoded) => encoded,
                Err(e) => {
                    tracing::warn!(worker_id = self.id, error = %e, "Dropping unencodable result");
                    continue;
                }
            };

            match sink.send(encoded).await {
                Ok(()) => {}
                Err(e) if e.is_closed() => break,
                // No retries: the result is lost, the worker is not
                Err(e) => tracing::warn!(worker_id = self.id, error = %e, "Failed to send result"),
            }
        }

        tracing::debug!(worker_id = self.id, handled, "Worker loop finished");
        Ok(handled)
    }

    /// Turn one task payload into its result
    pub async fn execute(&self, payload: &[u8]) -> ResultDescriptor {
        let task = match decode_task(payload) {
            Ok(task) => task,
            Err(e) => {
                tracing::debug!(worker_id = self.id, error = %e, "Undecodable task");
                return ResultDescriptor::failure("", self.id, self.error_message(&format!("{:#}", e)));
            }
        };

        match self.engine.fetch(&task.target).await {
            Ok(response) => {
                ResultDescriptor::success(task.target, self.id, response.latency, response.status_code)
            }
            Err(e) => {
                let message = self.error_message(&e.to_string());
                ResultDescriptor::failure(task.target, self.id, message)
            }
        }
    }

    fn error_message(&self, text: &str) -> String {
        format!("P{} Error: '{}'", self.id, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::protocol::{decode_result, encode_task, Outcome, TaskDescriptor};
    use crate::engine::mock::{MockEngine, MockResponse};
    use crate::transport::{Context, Endpoint};
    use std::time::Duration;

    fn task(target: &str) -> Vec<u8> {
        encode_task(&TaskDescriptor::new(target)).unwrap()
    }

    #[tokio::test]
    async fn test_execute_success() {
        let worker = Worker::new(3, Arc::new(MockEngine::always(404, Duration::from_millis(7))));
        let result = worker.execute(&task("http://a/")).await;

        assert_eq!(result.target, "http://a/");
        assert_eq!(result.worker_id, 3);
        assert_eq!(
            result.outcome,
            Outcome::Success {
                latency: Duration::from_millis(7),
                status_code: 404
            }
        );
    }

    #[tokio::test]
    async fn test_execute_failure_message() {
        let engine = MockEngine::from_script(vec![MockResponse::fail("connection refused")]);
        let worker = Worker::new(2, Arc::new(engine));
        let result = worker.execute(&task("http://a/")).await;

        assert_eq!(result.target, "http://a/");
        match result.outcome {
            Outcome::Failure { error_message } => {
                assert_eq!(error_message, "P2 Error: 'connection refused'");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_undecodable_task() {
        let engine = MockEngine::always(200, Duration::ZERO);
        let worker = Worker::new(1, Arc::new(engine.clone()));
        let result = worker.execute(b"\xc1not msgpack").await;

        assert_eq!(result.target, "");
        assert!(!result.is_success());
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_terminate_abandons_slow_fetch() {
        let ctx = Context::new();
        let work = Endpoint::inproc("work");
        let results = Endpoint::inproc("results");

        let mut distributor = ctx.bind_push(&work).await.unwrap();
        let collector = ctx.bind_pull(&results).await.unwrap();
        let mut tasks = ctx.connect_pull(&work).await.unwrap();
        let mut sink = ctx.connect_push(&results).await.unwrap();

        let engine = MockEngine::always(200, Duration::ZERO).with_delay(Duration::from_secs(30));
        let worker = Worker::new(0, Arc::new(engine.clone())).with_cancellation(ctx.clone());
        let handle = tokio::spawn(async move { worker.run(&mut tasks, &mut sink).await });

        distributor.send(task("http://slow/")).await.unwrap();
        while engine.call_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        drop(distributor);
        drop(collector);
        tokio::time::timeout(Duration::from_secs(2), ctx.terminate())
            .await
            .expect("terminate waited on the fetch");

        // The abandoned task produced no result
        assert_eq!(handle.await.unwrap().unwrap(), 0);
        assert_eq!(ctx.open_sockets(), 0);
    }

    #[tokio::test]
    async fn test_run_until_closed() {
        let ctx = Context::new();
        let work = Endpoint::inproc("work");
        let results = Endpoint::inproc("results");

        let mut distributor = ctx.bind_push(&work).await.unwrap();
        let mut collector = ctx.bind_pull(&results).await.unwrap();
        let mut tasks = ctx.connect_pull(&work).await.unwrap();
        let mut sink = ctx.connect_push(&results).await.unwrap();

        let engine = MockEngine::from_script(vec![
            MockResponse::status(200, Duration::from_millis(1)),
            MockResponse::fail("boom"),
        ]);
        let worker = Worker::new(0, Arc::new(engine));
        let handle = tokio::spawn(async move { worker.run(&mut tasks, &mut sink).await });

        distributor.send(task("http://a/")).await.unwrap();
        distributor.send(task("http://b/")).await.unwrap();
        distributor.send(b"junk".to_vec()).await.unwrap();

        let first = decode_result(&collector.recv().await.unwrap()).unwrap();
        let second = decode_result(&collector.recv().await.unwrap()).unwrap();
        let third = decode_result(&collector.recv().await.unwrap()).unwrap();
        assert!(first.is_success());
        assert!(!second.is_success());
        assert_eq!(third.target, "");

        drop(distributor);
        drop(collector);
        ctx.terminate().await;

        let handled = handle.await.unwrap().unwrap();
        assert_eq!(handled, 3);
        assert_eq!(ctx.open_sockets(), 0);
    }
}
