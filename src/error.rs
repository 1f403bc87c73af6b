//! Error types for the transport and the unit of work
//!
//! Most of httpulse propagates `anyhow::Error` with context. The two seams
//! where callers branch on the *kind* of failure get structured errors:
//!
//! - [`ChannelError`]: returned by every socket send/receive. `Closed` is the
//!   ordinary shutdown signal, not a fault.
//! - [`FetchError`]: returned by a fetch engine. Workers turn it into a
//!   failure result instead of propagating it.

use thiserror::Error;

/// Errors surfaced by push/pull sockets
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The owning context was terminated or the socket was closed
    #[error("channel closed")]
    Closed,

    /// Endpoint string could not be parsed
    #[error("invalid endpoint '{0}' (expected tcp://host:port or inproc://name)")]
    InvalidEndpoint(String),

    /// Connect to an in-process endpoint nobody has bound
    #[error("in-process endpoint '{0}' is not bound")]
    NotBound(String),

    /// In-process endpoint already bound in this context
    #[error("in-process endpoint '{0}' is already bound")]
    AlreadyBound(String),

    /// Peer announced a frame larger than we accept
    #[error("frame too large: {0} bytes (max {})", crate::transport::frame::MAX_FRAME_LEN)]
    FrameTooLarge(usize),

    /// Socket level IO failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// True when the error means "stop this activity"
    pub fn is_closed(&self) -> bool {
        matches!(self, ChannelError::Closed)
    }
}

/// Errors from executing one unit of work
#[derive(Error, Debug)]
pub enum FetchError {
    /// Target is not a usable URL
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Request failed before a response arrived
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// Scripted failure from the mock engine
    #[error("{0}")]
    Mock(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_is_closed() {
        assert!(ChannelError::Closed.is_closed());
        let io = ChannelError::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(!io.is_closed());
    }

    #[test]
    fn test_error_messages() {
        let err = ChannelError::InvalidEndpoint("udp://x".to_string());
        assert!(err.to_string().contains("udp://x"));

        let err = ChannelError::FrameTooLarge(1 << 30);
        assert!(err.to_string().contains("frame too large"));

        let err = FetchError::InvalidTarget {
            target: "nope".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert_eq!(err.to_string(), "invalid target 'nope': relative URL without a base");
    }
}
