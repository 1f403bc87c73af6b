//! Task distributor
//!
//! Emits one task per iteration onto the work channel, picking the target
//! uniformly at random from the configured list. The push socket balances
//! tasks round-robin over whichever workers are connected and suspends while
//! there are none, so the distributor needs no knowledge of the pool.
//!
//! The distributor never waits for results. It stops after `request_count`
//! tasks, or when the channel reports `Closed` (session terminated; the only
//! way an unbounded run stops).

use super::protocol::{encode_task, TaskDescriptor};
use crate::config::RunConfig;
use crate::distribution::{uniform::UniformDistribution, Distribution};
use crate::error::ChannelError;
use crate::output::progress_marker;
use crate::transport::MessageSink;
use crate::Result;
use anyhow::Context;

/// Marker printed per task sent
const TASK_MARKER: char = '-';

/// Send tasks until the configured count is reached or the channel closes
///
/// Takes ownership of `sink`; it is closed when this returns. Returns the
/// number of tasks sent.
pub async fn run<K>(config: &RunConfig, mut sink: K) -> Result<u64>
where
    K: MessageSink,
{
    let targets = &config.control.targets;
    if targets.is_empty() {
        anyhow::bail!("no targets to distribute");
    }

    let bound = config.control.request_count;
    let progress = config.output.progress;
    let mut dist = UniformDistribution::from_optional_seed(config.control.seed);

    if progress {
        println!("Distributor Started");
    }
    tracing::debug!(request_count = bound, targets = targets.len(), "Distributor started");

    let mut sent = 0u64;
    while bound == 0 || sent < bound {
        let target = dist.pick(targets.as_slice()).context("no targets to distribute")?;
        let payload = encode_task(&TaskDescriptor::new(target.as_str()))?;

        // Suspends until a worker is connected
        match sink.send(payload).await {
            Ok(()) => {}
            Err(ChannelError::Closed) => {
                tracing::debug!(sent, "Work channel closed, distributor stopping");
                break;
            }
            Err(e) => return Err(e).context("Failed to send task"),
        }

        sent += 1;
        if progress {
            progress_marker(TASK_MARKER);
        }
    }

    tracing::debug!(sent, "Distributor finished");
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::protocol::decode_task;
    use crate::transport::{Context, Endpoint, MessageSource};

    fn config(count: u64, targets: &[&str]) -> RunConfig {
        let mut config = RunConfig::default();
        config.control.request_count = count;
        config.control.targets = targets.iter().map(|t| t.to_string()).collect();
        config.control.seed = Some(1);
        config.output.progress = false;
        config
    }

    #[tokio::test]
    async fn test_sends_exactly_count() {
        let ctx = Context::new();
        let ep = Endpoint::inproc("work");
        let sink = ctx.bind_push(&ep).await.unwrap();
        let mut source = ctx.connect_pull(&ep).await.unwrap();

        let sent = run(&config(5, &["http://a/", "http://b/"]), sink).await.unwrap();
        assert_eq!(sent, 5);

        for _ in 0..5 {
            let task = decode_task(&source.recv().await.unwrap()).unwrap();
            assert!(task.target == "http://a/" || task.target == "http://b/");
        }
    }

    #[tokio::test]
    async fn test_unbounded_stops_on_terminate() {
        let ctx = Context::new();
        let ep = Endpoint::inproc("work");
        let sink = ctx.bind_push(&ep).await.unwrap();

        // Nobody pulls, so the inproc queue fills and send suspends
        let cfg = config(0, &["http://a/"]);
        let handle = tokio::spawn(async move { run(&cfg, sink).await });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        ctx.terminate().await;

        let sent = handle.await.unwrap().unwrap();
        assert!(sent > 0);
        assert_eq!(ctx.open_sockets(), 0);
    }

    #[tokio::test]
    async fn test_no_targets_is_an_error() {
        let ctx = Context::new();
        let sink = ctx.bind_push(&Endpoint::inproc("work")).await.unwrap();
        assert!(run(&config(1, &[]), sink).await.is_err());
    }

    #[tokio::test]
    async fn test_seeded_runs_repeat() {
        let ctx = Context::new();
        let mut picks = Vec::new();

        for name in ["w1", "w2"] {
            let ep = Endpoint::inproc(name);
            let sink = ctx.bind_push(&ep).await.unwrap();
            let mut source = ctx.connect_pull(&ep).await.unwrap();
            run(&config(8, &["A", "B", "C"]), sink).await.unwrap();

            let mut seq = Vec::new();
            for _ in 0..8 {
                seq.push(decode_task(&source.recv().await.unwrap()).unwrap().target);
            }
            picks.push(seq);
        }

        assert_eq!(picks[0], picks[1]);
    }
}
