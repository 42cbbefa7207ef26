//! Concurrent step execution and verification engine for S3 conformance
//! scenarios.
//!
//! Scenario steps call into this crate to run object operations at a fixed
//! fan-out width, drive a multipart upload through its lifecycle, and wait
//! for eventually consistent state after destructive operations.
//!
//! # Architecture
//!
//! ```text
//! scenario step
//!        |
//!        v
//! ObjectWorkers / MultipartTracker
//!        |              \
//!        v               v
//!   fan_out (N tasks)   ConsistencyWaiter
//!        |              /
//!        v             v
//!   ObjectStore (aws-sdk-s3 | in-memory)
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod fanout;
pub mod key;
pub mod multipart;
pub mod payload;
pub mod store;
pub mod waiter;
pub mod worker;

pub use config::HarnessConfig;
pub use error::{HarnessError, HarnessResult};
pub use fanout::{Concurrency, FanOutReport, WorkerOutcome, fan_out};
pub use key::ObjectKey;
pub use multipart::{MultipartTracker, SessionState};
pub use store::{InMemoryObjectStore, ObjectStore, S3ObjectStore};
pub use waiter::ConsistencyWaiter;
pub use worker::ObjectWorkers;
