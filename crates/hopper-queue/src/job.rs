//! Job payload and queue handler traits

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// Job Identifier
pub type JobId = Uuid;

/// A type that can be enqueued as a job.
///
/// `JOB_TYPE` routes the payload to its [`Queue`] and is written into every
/// job key, so it must stay stable across deployments and must not contain
/// `_`.
///
/// ```rust
/// use hopper_queue::JobPayload;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Greeting {
///     name: String,
/// }
///
/// impl JobPayload for Greeting {
///     const JOB_TYPE: &'static str = "Greeting";
/// }
/// ```
pub trait JobPayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    const JOB_TYPE: &'static str;
}

/// Handler for one payload type.
///
/// `dequeue` does the work. When it returns an error, `on_error` is called
/// once on the same worker with that error; the job is not retried.
#[async_trait]
pub trait Queue: Send + Sync + 'static {
    type Payload: JobPayload;

    /// Process a job
    async fn dequeue(&self, job_id: &str, payload: &Self::Payload) -> anyhow::Result<()>;

    /// Called when `dequeue` fails
    async fn on_error(&self, job_id: &str, payload: &Self::Payload, error: anyhow::Error);
}
