//! Job type registry
//!
//! Maps a job type name to the [`Queue`] registered for it. Queues are
//! registered through the generic [`Registry::register`], which fixes the
//! payload type at compile time; the registry then erases it behind
//! [`ErasedQueue`] so workers can dispatch raw payload bytes by name.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::codec;
use crate::error::QueueError;
use crate::job::{JobPayload, Queue};
use crate::key::DELIMITER;

/// What happened when a payload was handed to its queue
#[derive(Debug)]
pub(crate) enum Dispatch {
    Completed,
    /// `dequeue` failed and `on_error` has run
    Failed(String),
    /// Payload bytes did not decode into the queue's payload type
    Undecodable(serde_json::Error),
}

#[async_trait]
pub(crate) trait ErasedQueue: Send + Sync {
    async fn dispatch(&self, job_id: &str, bytes: &[u8]) -> Dispatch;
}

struct Registered<Q>(Q);

#[async_trait]
impl<Q: Queue> ErasedQueue for Registered<Q> {
    async fn dispatch(&self, job_id: &str, bytes: &[u8]) -> Dispatch {
        let payload: Q::Payload = match codec::decode(bytes) {
            Ok(payload) => payload,
            Err(e) => return Dispatch::Undecodable(e),
        };

        match self.0.dequeue(job_id, &payload).await {
            Ok(()) => Dispatch::Completed,
            Err(e) => {
                let reason = format!("{e:#}");
                self.0.on_error(job_id, &payload, e).await;
                Dispatch::Failed(reason)
            }
        }
    }
}

/// Job type name → queue. Read-only once workers are running.
#[derive(Default)]
pub struct Registry {
    queues: HashMap<&'static str, Box<dyn ErasedQueue>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `queue` under its payload's job type.
    ///
    /// # Errors
    ///
    /// - [`QueueError::InvalidJobType`] if the name is empty or contains the
    ///   key delimiter
    /// - [`QueueError::DuplicateQueue`] if the name is already taken
    pub fn register<Q: Queue>(&mut self, queue: Q) -> Result<(), QueueError> {
        let job_type = <Q::Payload as JobPayload>::JOB_TYPE;

        if job_type.is_empty() || job_type.contains(DELIMITER) {
            return Err(QueueError::InvalidJobType(job_type.to_string()));
        }
        if self.queues.contains_key(job_type) {
            return Err(QueueError::DuplicateQueue(job_type.to_string()));
        }

        self.queues.insert(job_type, Box::new(Registered(queue)));
        Ok(())
    }

    pub(crate) fn resolve(&self, job_type: &str) -> Option<&dyn ErasedQueue> {
        self.queues.get(job_type).map(|q| q.as_ref())
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.queues.contains_key(job_type)
    }

    /// Registered job type names, in no particular order
    pub fn job_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.queues.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
