//! Redis-backed broker
//!
//! Lists map to Redis lists (`RPUSH` / `LPOP`), payloads to plain string keys
//! (`SET` / `GET` / `DEL`). The layout matches existing deployments, so
//! workers written against the same key scheme can share one Redis.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::broker::{Broker, BrokerError};

/// [`Broker`] over a Redis connection manager (reconnects automatically).
#[derive(Clone)]
pub struct RedisBroker {
    redis: ConnectionManager,
}

impl RedisBroker {
    /// Connects to Redis and verifies the connection with `PING`.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::Connection` if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(redis_url: &str) -> Result<Self, BrokerError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        let broker = Self { redis };
        broker.ping().await?;
        Ok(broker)
    }

    /// Wraps an existing connection manager.
    pub fn from_connection(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn ping(&self) -> Result<(), BrokerError> {
        let mut conn = self.redis.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn push_back(&self, list: &str, value: &str) -> Result<usize, BrokerError> {
        let mut conn = self.redis.clone();
        Ok(conn.rpush::<_, _, usize>(list, value).await?)
    }

    async fn pop_front(&self, list: &str) -> Result<Option<String>, BrokerError> {
        let mut conn = self.redis.clone();
        Ok(conn.lpop::<_, Option<String>>(list, None).await?)
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), BrokerError> {
        let mut conn = self.redis.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BrokerError> {
        let mut conn = self.redis.clone();
        Ok(conn.get::<_, Option<Vec<u8>>>(key).await?)
    }

    async fn delete(&self, key: &str) -> Result<bool, BrokerError> {
        let mut conn = self.redis.clone();
        let removed: usize = conn.del(key).await?;
        Ok(removed > 0)
    }
}
