//! In-memory broker for tests and single-process use

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::broker::{Broker, BrokerError};

/// A [`Broker`] living entirely in process memory.
///
/// Cloning is cheap and clones share the same lists and keys, so a test can
/// hand one clone to a [`QueueHandler`](crate::QueueHandler) and inspect
/// another.
#[derive(Debug, Default, Clone)]
pub struct MemoryBroker {
    lists: Arc<RwLock<HashMap<String, VecDeque<String>>>>,
    values: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length of `list`
    pub async fn len(&self, list: &str) -> usize {
        self.lists.read().await.get(list).map_or(0, VecDeque::len)
    }

    /// Whether `list` is empty or missing
    pub async fn is_empty(&self, list: &str) -> bool {
        self.len(list).await == 0
    }

    /// Snapshot of `list`, head first
    pub async fn entries(&self, list: &str) -> Vec<String> {
        self.lists
            .read()
            .await
            .get(list)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of stored key-value entries
    pub async fn key_count(&self) -> usize {
        self.values.read().await.len()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn push_back(&self, list: &str, value: &str) -> Result<usize, BrokerError> {
        let mut lists = self.lists.write().await;
        let entries = lists.entry(list.to_string()).or_default();
        entries.push_back(value.to_string());
        Ok(entries.len())
    }

    async fn pop_front(&self, list: &str) -> Result<Option<String>, BrokerError> {
        let mut lists = self.lists.write().await;
        Ok(lists.get_mut(list).and_then(VecDeque::pop_front))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), BrokerError> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BrokerError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool, BrokerError> {
        Ok(self.values.write().await.remove(key).is_some())
    }
}
