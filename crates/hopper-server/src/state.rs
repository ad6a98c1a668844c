//! Application State

use hopper_queue::QueueHandler;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    queue: Arc<QueueHandler>,
}

impl AppState {
    pub fn new(queue: Arc<QueueHandler>) -> Self {
        Self { queue }
    }

    /// Get queue handler (cloned Arc for sharing)
    pub fn queue(&self) -> Arc<QueueHandler> {
        self.queue.clone()
    }
}
