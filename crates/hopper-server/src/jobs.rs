//! Built-in queues served by the Hopper server

use async_trait::async_trait;
use hopper_queue::{JobPayload, Queue, QueueError, QueueHandler};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use tracing::{error, info};

/// Hash `input` with SHA-512, `count` times over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashJob {
    pub input: String,
    pub count: u32,
}

impl JobPayload for HashJob {
    const JOB_TYPE: &'static str = "HashJob";
}

impl HashJob {
    /// Hex digest after `count` rounds; `count == 0` yields the raw input bytes
    pub fn digest(&self) -> String {
        let mut bytes = self.input.as_bytes().to_vec();
        for _ in 0..self.count {
            bytes = Sha512::digest(&bytes).to_vec();
        }
        hex::encode(bytes)
    }
}

#[derive(Debug, Default)]
pub struct HashQueue;

#[async_trait]
impl Queue for HashQueue {
    type Payload = HashJob;

    async fn dequeue(&self, job_id: &str, payload: &HashJob) -> anyhow::Result<()> {
        let job = payload.clone();
        // Large counts are CPU-bound; keep them off the async workers
        let digest = tokio::task::spawn_blocking(move || job.digest()).await?;
        info!(job_id, rounds = payload.count, digest = %digest, "Hash job finished");
        Ok(())
    }

    async fn on_error(&self, job_id: &str, _payload: &HashJob, error: anyhow::Error) {
        error!(job_id, error = %error, "Hash job failed");
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Greeting {
    pub name: String,
}

impl JobPayload for Greeting {
    const JOB_TYPE: &'static str = "Greeting";
}

#[derive(Debug, Default)]
pub struct GreetingQueue;

#[async_trait]
impl Queue for GreetingQueue {
    type Payload = Greeting;

    async fn dequeue(&self, job_id: &str, payload: &Greeting) -> anyhow::Result<()> {
        let name = payload.name.trim();
        if name.is_empty() {
            anyhow::bail!("greeting has no name");
        }
        info!(job_id, "Hello, {}!", name);
        Ok(())
    }

    async fn on_error(&self, job_id: &str, payload: &Greeting, error: anyhow::Error) {
        error!(job_id, name = %payload.name, error = %error, "Greeting job failed");
    }
}

/// Register every built-in queue on `handler`
pub fn register_all(handler: &mut QueueHandler) -> Result<(), QueueError> {
    handler.register_queue(HashQueue)?;
    handler.register_queue(GreetingQueue)?;
    Ok(())
}
