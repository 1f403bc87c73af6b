//! In-process transport
//!
//! Backed by bounded tokio mpsc channels registered under a name in the
//! owning [`Context`]. Whoever binds creates the channel; peers that connect
//! share the other end:
//!
//! - bound push: connected pull sockets compete for one receiver, so each
//!   message goes to exactly one of them
//! - bound pull: connected push sockets clone the sender (fair queuing)
//!
//! A peer that goes away never produces `Closed` here. Like the TCP transport
//! the socket keeps waiting until its context is terminated.

use super::Context;
use crate::error::ChannelError;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Messages buffered per in-process endpoint before senders wait
pub const INPROC_CAPACITY: usize = 1000;

/// What a bound in-process endpoint exposes to connecting peers
pub(crate) enum Binding {
    /// Bound push socket: connectors receive from the shared receiver
    Push(Arc<Mutex<mpsc::Receiver<Vec<u8>>>>),
    /// Bound pull socket: connectors send into this sender
    Pull(mpsc::Sender<Vec<u8>>),
}

/// Sending half of an in-process endpoint
pub struct InprocPush {
    tx: mpsc::Sender<Vec<u8>>,
}

impl InprocPush {
    pub(crate) fn bind(ctx: &Context, name: &str) -> Result<Self, ChannelError> {
        let (tx, rx) = mpsc::channel(INPROC_CAPACITY);
        register(ctx, name, Binding::Push(Arc::new(Mutex::new(rx))))?;
        Ok(Self { tx })
    }

    pub(crate) fn connect(ctx: &Context, name: &str) -> Result<Self, ChannelError> {
        ctx.with_inproc(|registry| match registry.get(name) {
            Some(Binding::Pull(tx)) => Ok(Self { tx: tx.clone() }),
            _ => Err(ChannelError::NotBound(name.to_string())),
        })
    }

    pub(crate) async fn send(&mut self, payload: Vec<u8>) -> Result<(), ChannelError> {
        if self.tx.send(payload).await.is_err() {
            // Receiver is gone; wait for termination like a disconnected TCP peer
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Receiving half of an in-process endpoint
pub struct InprocPull {
    rx: Arc<Mutex<mpsc::Receiver<Vec<u8>>>>,
}

impl InprocPull {
    pub(crate) fn bind(ctx: &Context, name: &str) -> Result<Self, ChannelError> {
        let (tx, rx) = mpsc::channel(INPROC_CAPACITY);
        register(ctx, name, Binding::Pull(tx))?;
        Ok(Self {
            rx: Arc::new(Mutex::new(rx)),
        })
    }

    pub(crate) fn connect(ctx: &Context, name: &str) -> Result<Self, ChannelError> {
        ctx.with_inproc(|registry| match registry.get(name) {
            Some(Binding::Push(rx)) => Ok(Self { rx: Arc::clone(rx) }),
            _ => Err(ChannelError::NotBound(name.to_string())),
        })
    }

    pub(crate) async fn recv(&mut self) -> Result<Vec<u8>, ChannelError> {
        let next = self.rx.lock().await.recv().await;
        match next {
            Some(payload) => Ok(payload),
            None => std::future::pending().await,
        }
    }
}

fn register(ctx: &Context, name: &str, binding: Binding) -> Result<(), ChannelError> {
    ctx.with_inproc(|registry| {
        if registry.contains_key(name) {
            return Err(ChannelError::AlreadyBound(name.to_string()));
        }
        registry.insert(name.to_string(), binding);
        Ok(())
    })
}
