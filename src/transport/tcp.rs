//! TCP transport
//!
//! Four socket flavours, one per role and direction:
//!
//! | Socket          | Side    | Behaviour                                         |
//! |-----------------|---------|---------------------------------------------------|
//! | `BoundPush`     | control | round-robin over peers with queue room            |
//! | `BoundPull`     | control | fair-queues frames from every connected peer      |
//! | `ConnectedPull` | worker  | one connection, re-established if it drops        |
//! | `ConnectedPush` | worker  | one connection, re-established if it drops        |
//!
//! A bound push socket with no peers suspends the sender until the first
//! peer connects; nothing is dropped and "no peer yet" is not an error.
//! Connected sockets do not need the bound side to exist yet: they dial in
//! the background and keep retrying until the socket is dropped.

use super::frame::{read_frame, write_frame, MAX_FRAME_LEN};
use crate::error::ChannelError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use tokio::task::{JoinHandle, JoinSet};

/// Frames buffered from all peers of a bound pull socket
const PULL_QUEUE_DEPTH: usize = 1000;

/// Frames queued per peer of a bound push socket
const PEER_QUEUE_DEPTH: usize = 16;

/// Initial delay between connection attempts
const RECONNECT_MIN: Duration = Duration::from_millis(50);

/// Upper bound of the reconnect backoff
const RECONNECT_MAX: Duration = Duration::from_secs(1);

/// Bound push socket: load-balances frames across connected peers
///
/// Every peer gets its own bounded outgoing queue drained by a writer task.
/// `send` round-robins over the peers whose queue has room, so a peer that
/// stops reading only stalls its own queue. The sender suspends when there
/// are no peers or every queue is full.
pub struct BoundPush {
    local_addr: SocketAddr,
    peers: Vec<Peer>,
    next: usize,
    incoming: mpsc::UnboundedReceiver<Peer>,
    /// Signalled by writer tasks whenever a queue slot frees up
    space: Arc<Notify>,
    accept_task: JoinHandle<()>,
}

struct Peer {
    addr: SocketAddr,
    queue: mpsc::Sender<Vec<u8>>,
}

impl BoundPush {
    pub(crate) async fn bind(addr: &str) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (tx, incoming) = mpsc::unbounded_channel();
        let space = Arc::new(Notify::new());
        let accept_task = tokio::spawn(push_accept_loop(listener, tx, Arc::clone(&space)));

        tracing::debug!(%local_addr, "Push socket bound");

        Ok(Self {
            local_addr,
            peers: Vec::new(),
            next: 0,
            incoming,
            space,
            accept_task,
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of peers currently attached
    pub(crate) fn peer_count(&mut self) -> usize {
        self.refresh_peers();
        self.peers.len()
    }

    pub(crate) async fn send(&mut self, mut payload: Vec<u8>) -> Result<(), ChannelError> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(ChannelError::FrameTooLarge(payload.len()));
        }

        loop {
            self.refresh_peers();

            let count = self.peers.len();
            for offset in 0..count {
                let idx = (self.next + offset) % count;
                match self.peers[idx].queue.try_send(payload) {
                    Ok(()) => {
                        self.next = idx + 1;
                        return Ok(());
                    }
                    Err(TrySendError::Full(returned)) | Err(TrySendError::Closed(returned)) => {
                        payload = returned;
                    }
                }
            }

            // No peer, or every queue is full: wait for a peer or a free slot
            let arrived = tokio::select! {
                peer = self.incoming.recv() => Some(peer),
                _ = self.space.notified(), if count > 0 => None,
            };
            match arrived {
                Some(Some(peer)) => self.peers.push(peer),
                Some(None) => return Err(ChannelError::Closed),
                None => {}
            }
        }
    }

    /// Attach newly accepted peers and forget the ones whose writer exited
    fn refresh_peers(&mut self) {
        while let Ok(peer) = self.incoming.try_recv() {
            self.peers.push(peer);
        }
        self.peers.retain(|peer| {
            let open = !peer.queue.is_closed();
            if !open {
                tracing::warn!(peer = %peer.addr, "Dropping push peer");
            }
            open
        });
    }
}

impl Drop for BoundPush {
    fn drop(&mut self) {
        // Writer tasks keep running until their queues are flushed
        self.accept_task.abort();
    }
}

async fn push_accept_loop(
    listener: TcpListener,
    peers: mpsc::UnboundedSender<Peer>,
    space: Arc<Notify>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let _ = stream.set_nodelay(true);
                tracing::debug!(peer = %addr, "Push peer connected");

                let (queue, frames) = mpsc::channel(PEER_QUEUE_DEPTH);
                tokio::spawn(write_peer(stream, addr, frames, Arc::clone(&space)));
                if peers.send(Peer { addr, queue }).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept connection");
                tokio::time::sleep(RECONNECT_MIN).await;
            }
        }
    }
}

/// Drain one peer's queue onto its connection
///
/// Exits when the socket is gone and the queue is empty, or on the first
/// write error. Either way the queue's receiver is dropped, which the bound
/// socket sees as a closed peer.
async fn write_peer(
    mut stream: TcpStream,
    addr: SocketAddr,
    mut frames: mpsc::Receiver<Vec<u8>>,
    space: Arc<Notify>,
) {
    while let Some(payload) = frames.recv().await {
        space.notify_one();
        if let Err(e) = write_frame(&mut stream, &payload).await {
            tracing::warn!(peer = %addr, error = %e, "Push peer write failed");
            break;
        }
    }
    drop(frames);
    space.notify_one();
}

/// Bound pull socket: fair-queues frames from every connected peer
pub struct BoundPull {
    local_addr: SocketAddr,
    frames: mpsc::Receiver<Vec<u8>>,
    accept_task: JoinHandle<()>,
}

impl BoundPull {
    pub(crate) async fn bind(addr: &str) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (tx, frames) = mpsc::channel(PULL_QUEUE_DEPTH);
        let accept_task = tokio::spawn(pull_accept_loop(listener, tx));

        tracing::debug!(%local_addr, "Pull socket bound");

        Ok(Self {
            local_addr,
            frames,
            accept_task,
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) async fn recv(&mut self) -> Result<Vec<u8>, ChannelError> {
        self.frames.recv().await.ok_or(ChannelError::Closed)
    }
}

impl Drop for BoundPull {
    fn drop(&mut self) {
        // Aborting the accept loop drops its JoinSet, which aborts every reader
        self.accept_task.abort();
    }
}

async fn pull_accept_loop(listener: TcpListener, frames: mpsc::Sender<Vec<u8>>) {
    let mut readers = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    tracing::debug!(peer = %addr, "Pull peer connected");
                    readers.spawn(read_peer(stream, addr, frames.clone()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(RECONNECT_MIN).await;
                }
            },
            Some(_) = readers.join_next(), if !readers.is_empty() => {}
        }
    }
}

async fn read_peer(mut stream: TcpStream, addr: SocketAddr, frames: mpsc::Sender<Vec<u8>>) {
    loop {
        match read_frame(&mut stream).await {
            Ok(Some(payload)) => {
                if frames.send(payload).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!(peer = %addr, "Pull peer disconnected");
                break;
            }
            Err(e) => {
                tracing::warn!(peer = %addr, error = %e, "Dropping pull peer");
                break;
            }
        }
    }
}

/// Outgoing connection shared by the connected socket flavours
///
/// Dialing starts in the background as soon as the socket is created, so a
/// worker shows up as a peer of the control process before it asks for work.
struct Connection {
    addr: String,
    stream: Option<TcpStream>,
    connecting: Option<JoinHandle<TcpStream>>,
}

impl Connection {
    fn open(addr: &str) -> Self {
        Self {
            addr: addr.to_string(),
            stream: None,
            connecting: Some(spawn_connect(addr)),
        }
    }

    async fn ensure_connected(&mut self) {
        while self.stream.is_none() {
            let addr = &self.addr;
            let handle = self.connecting.get_or_insert_with(|| spawn_connect(addr));
            let joined = handle.await;
            self.connecting = None;
            match joined {
                Ok(stream) => self.stream = Some(stream),
                Err(e) => tracing::warn!(addr = %self.addr, error = %e, "Connect task failed"),
            }
        }
    }

    fn reconnect(&mut self) {
        self.stream = None;
        self.connecting = Some(spawn_connect(&self.addr));
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(handle) = &self.connecting {
            handle.abort();
        }
    }
}

/// Connected pull socket
pub struct ConnectedPull {
    conn: Connection,
}

impl ConnectedPull {
    pub(crate) fn new(addr: &str) -> Self {
        Self {
            conn: Connection::open(addr),
        }
    }

    pub(crate) async fn recv(&mut self) -> Result<Vec<u8>, ChannelError> {
        loop {
            self.conn.ensure_connected().await;
            let Some(stream) = self.conn.stream.as_mut() else {
                continue;
            };

            match read_frame(stream).await {
                Ok(Some(payload)) => return Ok(payload),
                Ok(None) => {
                    tracing::debug!(addr = %self.conn.addr, "Peer closed connection, reconnecting");
                    self.conn.reconnect();
                }
                Err(e) => {
                    tracing::warn!(addr = %self.conn.addr, error = %e, "Receive failed, reconnecting");
                    self.conn.reconnect();
                }
            }
        }
    }
}

/// Connected push socket
pub struct ConnectedPush {
    conn: Connection,
}

impl ConnectedPush {
    pub(crate) fn new(addr: &str) -> Self {
        Self {
            conn: Connection::open(addr),
        }
    }

    pub(crate) async fn send(&mut self, payload: &[u8]) -> Result<(), ChannelError> {
        loop {
            self.conn.ensure_connected().await;
            let Some(stream) = self.conn.stream.as_mut() else {
                continue;
            };

            match write_frame(stream, payload).await {
                Ok(()) => return Ok(()),
                Err(ChannelError::FrameTooLarge(n)) => return Err(ChannelError::FrameTooLarge(n)),
                Err(e) => {
                    tracing::warn!(addr = %self.conn.addr, error = %e, "Send failed, reconnecting");
                    self.conn.reconnect();
                }
            }
        }
    }
}

fn spawn_connect(addr: &str) -> JoinHandle<TcpStream> {
    tokio::spawn(connect_with_retry(addr.to_string()))
}

/// Connect, retrying with capped exponential backoff until it succeeds
async fn connect_with_retry(addr: String) -> TcpStream {
    let mut backoff = RECONNECT_MIN;
    loop {
        match TcpStream::connect(addr.as_str()).await {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                tracing::debug!(%addr, "Connected");
                return stream;
            }
            Err(e) => {
                tracing::trace!(%addr, error = %e, "Connect failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(RECONNECT_MAX);
            }
        }
    }
}
