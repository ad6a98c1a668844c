//! Broker trait
//!
//! The queue needs two things from its store: a named FIFO list with atomic
//! pop, and a flat key-value space for payload bytes.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for BrokerError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
            BrokerError::Connection(e.to_string())
        } else {
            BrokerError::Backend(e.to_string())
        }
    }
}

/// Shared list + key-value store used as the queue's durable medium.
///
/// `pop_front` must be atomic: a popped value is handed to exactly one
/// caller, even when several processes share the broker.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Append a value to the tail of `list`, returning the list length after the push
    async fn push_back(&self, list: &str, value: &str) -> Result<usize, BrokerError>;

    /// Pop the head of `list`, `None` when the list is empty
    async fn pop_front(&self, list: &str) -> Result<Option<String>, BrokerError>;

    /// Store bytes under `key`, without expiry
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), BrokerError>;

    /// Load bytes stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BrokerError>;

    /// Remove `key`, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, BrokerError>;
}
