//! # Hopper Queue
//!
//! Durable, type-routed background jobs over a shared list + key-value
//! broker.
//!
//! Features:
//! - Typed registration: one [`Queue`] per [`JobPayload`] type
//! - Delayed jobs (`add_job_with_delay`)
//! - Pluggable broker (Redis, in-memory)
//! - Worker pool with a shared shutdown token and per-job panic isolation
//!
//! Delivery is at-most-once: a popped job is gone from the list, failed jobs
//! are handed to [`Queue::on_error`] and never retried.

pub mod broker;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod job;
pub mod key;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_broker;
pub mod registry;

pub use broker::{Broker, BrokerError};
pub use config::{PayloadRetention, QueueConfig};
pub use error::QueueError;
pub use handler::{DropReason, QueueHandler, Tick};
pub use job::{JobId, JobPayload, Queue};
pub use key::{JobKey, KeyError};
pub use memory::MemoryBroker;
#[cfg(feature = "redis")]
pub use redis_broker::RedisBroker;
pub use registry::Registry;
