//! Queue handler: enqueue path and worker pool

use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::broker::Broker;
use crate::codec;
use crate::config::{PayloadRetention, QueueConfig};
use crate::error::QueueError;
use crate::job::{JobId, JobPayload, Queue};
use crate::key::JobKey;
use crate::registry::{Dispatch, Registry};

/// Why a popped job key was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Wrong segment count or unparsable timestamp
    MalformedKey,
    /// No queue registered for the key's job type
    UnknownJobType,
    /// The payload entry is missing or could not be read
    PayloadMissing,
    /// The payload did not decode into the queue's payload type
    Undecodable,
}

/// Outcome of one worker-loop iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// The list was empty
    Idle,
    /// A job that is not due yet went back to the tail of the list.
    /// `alone` is set when it is now the only entry.
    Requeued { alone: bool },
    /// The key was discarded without dispatching
    Dropped(DropReason),
    /// `dequeue` returned `Ok`
    Completed { job_id: String },
    /// `dequeue` failed and `on_error` has been called
    Failed { job_id: String, error: String },
    /// The queue panicked; the worker carried on
    Panicked { job_id: String, message: String },
}

impl Tick {
    /// Whether the worker should back off before polling again
    fn should_back_off(&self) -> bool {
        matches!(self, Tick::Idle | Tick::Requeued { alone: true })
    }
}

/// Owns the job type registry, enqueues jobs and runs the workers.
///
/// Register every queue first, then share the handler behind an `Arc`:
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use hopper_queue::{MemoryBroker, QueueConfig, QueueHandler};
/// # use tokio_util::sync::CancellationToken;
/// # async fn demo() -> Result<(), hopper_queue::QueueError> {
/// let mut handler = QueueHandler::new(MemoryBroker::new(), QueueConfig::default());
/// // handler.register_queue(MyQueue)?;
/// let handler = Arc::new(handler);
///
/// let shutdown = CancellationToken::new();
/// handler.clone().run(4, shutdown.clone()).await?;
/// # Ok(())
/// # }
/// ```
pub struct QueueHandler {
    broker: Arc<dyn Broker>,
    registry: Registry,
    config: QueueConfig,
}

impl QueueHandler {
    pub fn new<B: Broker + 'static>(broker: B, config: QueueConfig) -> Self {
        Self::new_with_arc(Arc::new(broker), config)
    }

    /// Create a handler from an existing Arc broker (supports dyn dispatch)
    pub fn new_with_arc(broker: Arc<dyn Broker>, config: QueueConfig) -> Self {
        Self {
            broker,
            registry: Registry::new(),
            config,
        }
    }

    /// Register the queue handling `Q::Payload`.
    ///
    /// Registration needs `&mut self`, so it cannot overlap with
    /// [`run`](Self::run), which works on a shared handler.
    pub fn register_queue<Q: Queue>(&mut self, queue: Q) -> Result<(), QueueError> {
        let job_type = <Q::Payload as JobPayload>::JOB_TYPE;
        self.registry.register(queue)?;
        info!(job_type, "Registered queue");
        Ok(())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn broker(&self) -> Arc<dyn Broker> {
        self.broker.clone()
    }

    /// Enqueue a job that is eligible immediately
    pub async fn add_job<P: JobPayload>(&self, payload: &P) -> Result<JobId, QueueError> {
        self.enqueue(payload, None).await
    }

    /// Enqueue a job that must not run before `not_before` (whole seconds)
    pub async fn add_job_with_delay<P: JobPayload>(
        &self,
        payload: &P,
        not_before: DateTime<Utc>,
    ) -> Result<JobId, QueueError> {
        self.enqueue(payload, Some(not_before)).await
    }

    async fn enqueue<P: JobPayload>(
        &self,
        payload: &P,
        not_before: Option<DateTime<Utc>>,
    ) -> Result<JobId, QueueError> {
        if !self.registry.contains(P::JOB_TYPE) {
            return Err(QueueError::QueueNotFound(P::JOB_TYPE.to_string()));
        }

        let bytes = codec::encode(payload).map_err(QueueError::JobNotMarshalable)?;
        let id = Uuid::new_v4();
        let key = JobKey::new(P::JOB_TYPE, id, not_before).to_string();

        // List first, payload second. A crash in between leaves a key whose
        // payload is missing; workers drop it.
        self.broker.push_back(&self.config.list_name, &key).await?;
        self.broker.set(&key, &bytes).await?;

        debug!(job_id = %id, job_type = P::JOB_TYPE, ?not_before, "Job enqueued");
        Ok(id)
    }

    /// Pop one job key and carry it as far as it goes.
    ///
    /// Only broker failures while polling or requeueing are returned as
    /// errors; everything else is reported through [`Tick`].
    pub async fn process_next(&self) -> Result<Tick, QueueError> {
        let list = self.config.list_name.as_str();

        let Some(raw) = self.broker.pop_front(list).await? else {
            return Ok(Tick::Idle);
        };

        let key = match JobKey::parse(&raw) {
            Ok(key) => key,
            Err(e) => {
                debug!(key = %raw, error = %e, "Dropping malformed job key");
                return Ok(Tick::Dropped(DropReason::MalformedKey));
            }
        };

        if !key.is_due(Utc::now()) {
            let len = self.broker.push_back(list, &raw).await?;
            return Ok(Tick::Requeued { alone: len == 1 });
        }

        let Some(queue) = self.registry.resolve(&key.job_type) else {
            warn!(job_type = %key.job_type, job_id = %key.id, "No queue registered for job type");
            return Ok(Tick::Dropped(DropReason::UnknownJobType));
        };

        let bytes = match self.broker.get(&raw).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!(job_id = %key.id, job_type = %key.job_type, "Job payload missing");
                return Ok(Tick::Dropped(DropReason::PayloadMissing));
            }
            Err(e) => {
                error!(job_id = %key.id, error = %e, "Failed to load job payload");
                return Ok(Tick::Dropped(DropReason::PayloadMissing));
            }
        };

        if self.config.retention == PayloadRetention::DeleteOnRead {
            if let Err(e) = self.broker.delete(&raw).await {
                warn!(job_id = %key.id, error = %e, "Failed to delete job payload");
            }
        }

        info!(job_id = %key.id, job_type = %key.job_type, "Processing job");

        let outcome = AssertUnwindSafe(queue.dispatch(&key.id, &bytes))
            .catch_unwind()
            .await;

        let tick = match outcome {
            Ok(Dispatch::Completed) => {
                debug!(job_id = %key.id, "Job completed");
                Tick::Completed { job_id: key.id }
            }
            Ok(Dispatch::Failed(error)) => {
                warn!(job_id = %key.id, error = %error, "Job failed");
                Tick::Failed {
                    job_id: key.id,
                    error,
                }
            }
            Ok(Dispatch::Undecodable(e)) => {
                error!(job_id = %key.id, error = %e, "Job payload deserialization failed");
                Tick::Dropped(DropReason::Undecodable)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(job_id = %key.id, panic = %message, "Queue panicked while processing job");
                Tick::Panicked {
                    job_id: key.id,
                    message,
                }
            }
        };

        Ok(tick)
    }

    /// Run `workers` workers until `shutdown` is cancelled.
    ///
    /// Every worker observes the same token. A job already popped when the
    /// token fires is finished before its worker exits.
    pub async fn run(
        self: Arc<Self>,
        workers: usize,
        shutdown: CancellationToken,
    ) -> Result<(), QueueError> {
        if workers == 0 {
            return Err(QueueError::WorkersMustBePositive);
        }

        info!(
            workers,
            list = %self.config.list_name,
            queues = self.registry.len(),
            "Worker pool started"
        );

        let mut tasks = JoinSet::new();
        for worker_id in 0..workers {
            tasks.spawn(self.clone().worker(worker_id, shutdown.clone()));
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Worker task ended abnormally");
            }
        }

        info!("Worker pool stopped");
        Ok(())
    }

    async fn worker(self: Arc<Self>, worker_id: usize, shutdown: CancellationToken) {
        debug!(worker_id, "Worker starting");

        while !shutdown.is_cancelled() {
            let back_off = match self.process_next().await {
                Ok(tick) => tick.should_back_off(),
                Err(e) => {
                    error!(worker_id, error = %e, "Queue error");
                    true
                }
            };

            if back_off {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.backoff) => {}
                }
            }
        }

        debug!(worker_id, "Worker shutting down");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
