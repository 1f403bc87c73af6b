//! Distributed load generation
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │    Distributor   │  control
//!                 └──────[PUSH]──────┘
//!            ┌───────────┼───────────┐
//!        [PULL]       [PULL]      [PULL]
//!       Worker 0     Worker 1 ... Worker N   worker pool(s)
//!        [PUSH]       [PUSH]      [PUSH]
//!            └───────────┼───────────┘
//!                 ┌──────[PULL]──────┐
//!                 │     Collector    │  control
//!                 └──────────────────┘
//! ```
//!
//! Tasks are load-balanced round-robin over whichever workers are connected;
//! results are fair-queued back. There is no request/response exchange and
//! no registry of outstanding work: the collector knows it is done when it
//! has counted `request_count` results.
//!
//! # Modules
//!
//! - `protocol`: task and result payloads
//! - `distributor`: emits tasks
//! - `collector`: aggregates results
//! - `worker_pool`: runs the worker role
//! - `session`: runs the control role

pub mod collector;
pub mod distributor;
pub mod protocol;
pub mod session;
pub mod worker_pool;

pub use protocol::{Outcome, ResultDescriptor, TaskDescriptor};
pub use session::{ControlReport, ControlSession};
pub use worker_pool::WorkerPool;
