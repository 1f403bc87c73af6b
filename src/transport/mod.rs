//! Push/pull message transport
//!
//! httpulse moves work and results over two one-way channels. This module
//! provides the sockets for both ends of them.
//!
//! # Roles
//!
//! - **Push**: sends whole messages. A bound push socket load-balances
//!   round-robin across every connected peer.
//! - **Pull**: receives whole messages. A bound pull socket fair-queues
//!   messages from every connected peer.
//!
//! ```text
//!              control process
//!        [push, bind :2100]   [pull, bind :2101]
//!           /      |     \       /    |     \
//!      [pull]   [pull]  [pull] [push][push] [push]   (connect)
//!      worker 0 worker 1 ...   worker 0 ...
//! ```
//!
//! There is no acknowledgment: once `send` returns, the message has been
//! handed to exactly one peer and the sender keeps no copy.
//!
//! # Cancellation
//!
//! Every socket is created from a [`Context`]. Terminating the context makes
//! every pending `send`/`recv` return [`ChannelError::Closed`], which the
//! owning activity treats as its signal to close its sockets and stop.

pub mod context;
pub mod endpoint;
pub mod frame;
pub mod inproc;
pub mod tcp;

pub use context::Context;
pub use endpoint::{Endpoint, DEFAULT_RESULT_PORT, DEFAULT_WORK_PORT};

use crate::error::ChannelError;
use async_trait::async_trait;
use context::Lease;

/// Sending side of a one-way channel
#[async_trait]
pub trait MessageSink: Send {
    /// Hand one message to exactly one peer
    ///
    /// May suspend (no peer yet, peer busy). Returns `Closed` once the
    /// owning context has been terminated.
    async fn send(&mut self, payload: Vec<u8>) -> Result<(), ChannelError>;
}

/// Receiving side of a one-way channel
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message from any peer
    async fn recv(&mut self) -> Result<Vec<u8>, ChannelError>;
}

enum PushKind {
    TcpBound(tcp::BoundPush),
    TcpConnected(tcp::ConnectedPush),
    Inproc(inproc::InprocPush),
}

enum PullKind {
    TcpBound(tcp::BoundPull),
    TcpConnected(tcp::ConnectedPull),
    Inproc(inproc::InprocPull),
}

/// Load-balancing one-way sender
pub struct PushSocket {
    endpoint: Endpoint,
    kind: PushKind,
    lease: Lease,
}

/// Fair-queuing one-way receiver
pub struct PullSocket {
    endpoint: Endpoint,
    kind: PullKind,
    lease: Lease,
}

impl Context {
    /// Bind a push socket (one sender, many connecting receivers)
    pub async fn bind_push(&self, endpoint: &Endpoint) -> Result<PushSocket, ChannelError> {
        self.ensure_open()?;
        let (endpoint, kind, lease) = match endpoint {
            Endpoint::Tcp(addr) => {
                let socket = tcp::BoundPush::bind(addr).await?;
                let bound = Endpoint::Tcp(socket.local_addr().to_string());
                (bound, PushKind::TcpBound(socket), self.lease(None))
            }
            Endpoint::Inproc(name) => {
                let socket = inproc::InprocPush::bind(self, name)?;
                (endpoint.clone(), PushKind::Inproc(socket), self.lease(Some(name.clone())))
            }
        };
        Ok(PushSocket { endpoint, kind, lease })
    }

    /// Connect a push socket to a bound pull endpoint
    pub async fn connect_push(&self, endpoint: &Endpoint) -> Result<PushSocket, ChannelError> {
        self.ensure_open()?;
        let kind = match endpoint {
            Endpoint::Tcp(addr) => PushKind::TcpConnected(tcp::ConnectedPush::new(addr)),
            Endpoint::Inproc(name) => PushKind::Inproc(inproc::InprocPush::connect(self, name)?),
        };
        Ok(PushSocket {
            endpoint: endpoint.clone(),
            kind,
            lease: self.lease(None),
        })
    }

    /// Bind a pull socket (many connecting senders, one receiver)
    pub async fn bind_pull(&self, endpoint: &Endpoint) -> Result<PullSocket, ChannelError> {
        self.ensure_open()?;
        let (endpoint, kind, lease) = match endpoint {
            Endpoint::Tcp(addr) => {
                let socket = tcp::BoundPull::bind(addr).await?;
                let bound = Endpoint::Tcp(socket.local_addr().to_string());
                (bound, PullKind::TcpBound(socket), self.lease(None))
            }
            Endpoint::Inproc(name) => {
                let socket = inproc::InprocPull::bind(self, name)?;
                (endpoint.clone(), PullKind::Inproc(socket), self.lease(Some(name.clone())))
            }
        };
        Ok(PullSocket { endpoint, kind, lease })
    }

    /// Connect a pull socket to a bound push endpoint
    pub async fn connect_pull(&self, endpoint: &Endpoint) -> Result<PullSocket, ChannelError> {
        self.ensure_open()?;
        let kind = match endpoint {
            Endpoint::Tcp(addr) => PullKind::TcpConnected(tcp::ConnectedPull::new(addr)),
            Endpoint::Inproc(name) => PullKind::Inproc(inproc::InprocPull::connect(self, name)?),
        };
        Ok(PullSocket {
            endpoint: endpoint.clone(),
            kind,
            lease: self.lease(None),
        })
    }

    fn ensure_open(&self) -> Result<(), ChannelError> {
        if self.is_terminated() {
            return Err(ChannelError::Closed);
        }
        Ok(())
    }
}

impl PushSocket {
    /// Endpoint this socket is bound or connected to
    ///
    /// For a TCP socket bound to port 0 this is the port actually in use.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Number of attached peers, when the socket is a bound TCP socket
    pub fn peer_count(&mut self) -> Option<usize> {
        match &mut self.kind {
            PushKind::TcpBound(socket) => Some(socket.peer_count()),
            _ => None,
        }
    }

    /// Close the socket, releasing its slot in the context
    pub fn close(self) {
        tracing::trace!(endpoint = %self.endpoint, "Push socket closed");
    }
}

impl PullSocket {
    /// Endpoint this socket is bound or connected to
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Close the socket, releasing its slot in the context
    pub fn close(self) {
        tracing::trace!(endpoint = %self.endpoint, "Pull socket closed");
    }
}

#[async_trait]
impl MessageSink for PushSocket {
    async fn send(&mut self, payload: Vec<u8>) -> Result<(), ChannelError> {
        let PushSocket { kind, lease, .. } = self;
        let ctx = lease.context();
        if ctx.is_terminated() {
            return Err(ChannelError::Closed);
        }

        let sending = async {
            match kind {
                PushKind::TcpBound(socket) => socket.send(payload).await,
                PushKind::TcpConnected(socket) => socket.send(&payload).await,
                PushKind::Inproc(socket) => socket.send(payload).await,
            }
        };

        tokio::select! {
            biased;
            _ = ctx.terminated() => Err(ChannelError::Closed),
            result = sending => result,
        }
    }
}

#[async_trait]
impl MessageSource for PullSocket {
    async fn recv(&mut self) -> Result<Vec<u8>, ChannelError> {
        let PullSocket { kind, lease, .. } = self;
        let ctx = lease.context();
        if ctx.is_terminated() {
            return Err(ChannelError::Closed);
        }

        let receiving = async {
            match kind {
                PullKind::TcpBound(socket) => socket.recv().await,
                PullKind::TcpConnected(socket) => socket.recv().await,
                PullKind::Inproc(socket) => socket.recv().await,
            }
        };

        tokio::select! {
            biased;
            _ = ctx.terminated() => Err(ChannelError::Closed),
            result = receiving => result,
        }
    }
}
