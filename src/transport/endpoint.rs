//! Endpoint addresses
//!
//! Two schemes are understood:
//!
//! - `tcp://host:port`: a TCP endpoint. Port 0 is allowed when binding; the
//!   bound socket reports the port the OS picked.
//! - `inproc://name`: an in-process endpoint, visible only to sockets created
//!   from the same [`Context`](super::Context).

use crate::error::ChannelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default port of the work channel (distributor → workers)
pub const DEFAULT_WORK_PORT: u16 = 2100;

/// Default port of the result channel (workers → collector)
pub const DEFAULT_RESULT_PORT: u16 = 2101;

/// A parsed channel endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Endpoint {
    /// `host:port` of a TCP endpoint
    Tcp(String),
    /// Name of an in-process endpoint
    Inproc(String),
}

impl Endpoint {
    /// Build a TCP endpoint from host and port
    pub fn tcp(host: &str, port: u16) -> Self {
        if host.contains(':') && !host.starts_with('[') {
            Endpoint::Tcp(format!("[{}]:{}", host, port))
        } else {
            Endpoint::Tcp(format!("{}:{}", host, port))
        }
    }

    /// Build an in-process endpoint
    pub fn inproc(name: &str) -> Self {
        Endpoint::Inproc(name.to_string())
    }
}

impl FromStr for Endpoint {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ChannelError::InvalidEndpoint(s.to_string());

        if let Some(addr) = s.strip_prefix("tcp://") {
            let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
            if host.is_empty() || port.parse::<u16>().is_err() {
                return Err(invalid());
            }
            Ok(Endpoint::Tcp(addr.to_string()))
        } else if let Some(name) = s.strip_prefix("inproc://") {
            if name.is_empty() {
                return Err(invalid());
            }
            Ok(Endpoint::Inproc(name.to_string()))
        } else {
            Err(invalid())
        }
    }
}

impl TryFrom<String> for Endpoint {
    type Error = ChannelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
            Endpoint::Inproc(name) => write!(f, "inproc://{}", name),
        }
    }
}
