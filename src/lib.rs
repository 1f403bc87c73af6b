//! httpulse - distributed HTTP load generator
//!
//! A control process fans fetch tasks out to an elastic pool of worker
//! processes and collects timing and error results back. Both directions use
//! one-way, load-balanced push/pull channels; workers may join or leave at
//! any time and nothing on the control side tracks them.
//!
//! # Architecture
//!
//! - **Transport**: push/pull sockets over TCP or in-process channels, owned
//!   by a terminable context
//! - **Distributed**: distributor, collector, worker pool, control session
//! - **Engines**: the unit of work (reqwest GET, or a scripted mock)
//! - **Stats**: result classification and latency histograms
//! - **Output**: text report and JSON report file

pub mod config;
pub mod distributed;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod output;
pub mod stats;
pub mod transport;
pub mod worker;

// Re-export commonly used types
pub use config::RunConfig;
pub use engine::FetchEngine;
pub use error::{ChannelError, FetchError};

/// Result type used throughout httpulse
pub type Result<T> = anyhow::Result<T>;
