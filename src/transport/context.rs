//! Transport context
//!
//! A [`Context`] is the session handle every socket is created from. It
//! tracks how many sockets are still open and carries the termination signal
//! that unblocks pending sends and receives.
//!
//! Lifecycle:
//!
//! ```text
//! Context::new()
//!     |
//!     |-- bind/connect sockets (each holds a lease)
//!     |
//! terminate()
//!     |-- 1. raise termination: blocked send/recv return ChannelError::Closed
//!     |-- 2. wait until every lease has been dropped
//!     v
//! released
//! ```
//!
//! Sockets release their lease on drop, so a context can never be released
//! while one of its sockets is still open.

use super::inproc::Binding;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Shared transport session handle
///
/// Cheap to clone; all clones refer to the same session.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    /// Raised once by `terminate()`
    terminated: watch::Sender<bool>,

    /// Number of sockets created from this context and not yet closed
    open_sockets: watch::Sender<usize>,

    /// In-process endpoints bound in this context
    inproc: Mutex<HashMap<String, Binding>>,
}

impl Context {
    /// Create a new transport context
    pub fn new() -> Self {
        let (terminated, _) = watch::channel(false);
        let (open_sockets, _) = watch::channel(0usize);

        Self {
            inner: Arc::new(ContextInner {
                terminated,
                open_sockets,
                inproc: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Whether `terminate()` has been called
    pub fn is_terminated(&self) -> bool {
        *self.inner.terminated.borrow()
    }

    /// Number of sockets still open
    pub fn open_sockets(&self) -> usize {
        *self.inner.open_sockets.borrow()
    }

    /// Resolves once the context has been terminated
    pub async fn terminated(&self) {
        let mut rx = self.inner.terminated.subscribe();
        let _ = rx.wait_for(|terminated| *terminated).await;
    }

    /// Terminate the context
    ///
    /// Unblocks every pending send/receive with `ChannelError::Closed`, then
    /// waits until all sockets created from this context are closed. Safe to
    /// call more than once and from several clones.
    pub async fn terminate(&self) {
        let was_terminated = self.inner.terminated.send_replace(true);
        if !was_terminated {
            tracing::debug!(open_sockets = self.open_sockets(), "Terminating transport context");
        }

        let mut rx = self.inner.open_sockets.subscribe();
        let _ = rx.wait_for(|open| *open == 0).await;

        if !was_terminated {
            tracing::debug!("Transport context released");
        }
    }

    /// Register a new socket
    pub(crate) fn lease(&self, inproc_name: Option<String>) -> Lease {
        self.inner.open_sockets.send_modify(|open| *open += 1);
        Lease {
            ctx: self.clone(),
            inproc_name,
        }
    }

    /// Access the in-process endpoint registry
    pub(crate) fn with_inproc<T>(&self, f: impl FnOnce(&mut HashMap<String, Binding>) -> T) -> T {
        let mut registry = self.inner.inproc.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut registry)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("terminated", &self.is_terminated())
            .field("open_sockets", &self.open_sockets())
            .finish()
    }
}

/// Proof that a socket is open
///
/// Dropping the lease closes the socket's slot in the context and unbinds
/// its in-process endpoint, if any.
pub(crate) struct Lease {
    ctx: Context,
    inproc_name: Option<String>,
}

impl Lease {
    pub(crate) fn context(&self) -> &Context {
        &self.ctx
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(name) = self.inproc_name.take() {
            self.ctx.with_inproc(|registry| registry.remove(&name));
        }
        self.ctx.inner.open_sockets.send_modify(|open| *open = open.saturating_sub(1));
    }
}
