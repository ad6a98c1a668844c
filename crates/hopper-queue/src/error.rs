//! Error types for the queue crate

use crate::broker::BrokerError;

/// Errors surfaced to producers and to the code wiring up a [`QueueHandler`].
///
/// Failures that happen while a worker dispatches a job never become a
/// `QueueError`; they are logged and reported as a [`Tick`](crate::Tick).
///
/// [`QueueHandler`]: crate::QueueHandler
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// No queue is registered for the payload's job type
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    /// The payload could not be encoded for the broker
    #[error("job not marshalable: {0}")]
    JobNotMarshalable(#[source] serde_json::Error),

    /// A queue for this job type is already registered
    #[error("queue already registered for job type: {0}")]
    DuplicateQueue(String),

    /// Job type name is empty or contains the key delimiter
    #[error("invalid job type name {0:?}: must be non-empty and must not contain '_'")]
    InvalidJobType(String),

    #[error("Invalid configuration: workers must be greater than 0")]
    WorkersMustBePositive,

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),
}
