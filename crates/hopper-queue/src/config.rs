//! Queue configuration

use std::env;
use std::time::Duration;

/// What happens to a payload entry after a worker has loaded it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadRetention {
    /// Keep the entry. Payloads accumulate for the lifetime of the broker.
    #[default]
    Retain,
    /// Delete the entry right after a successful load
    DeleteOnRead,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Broker list holding job keys (env: HOPPER_QUEUE_LIST)
    pub list_name: String,
    /// Sleep when no job is ready (env: HOPPER_BACKOFF_MS)
    pub backoff: Duration,
    /// env: HOPPER_DELETE_ON_READ
    pub retention: PayloadRetention,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            list_name: "jobs".to_string(),
            backoff: Duration::from_secs(1),
            retention: PayloadRetention::Retain,
        }
    }
}

impl QueueConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let list_name = env::var("HOPPER_QUEUE_LIST")
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or(defaults.list_name);

        let backoff = env::var("HOPPER_BACKOFF_MS")
            .ok()
            .and_then(|ms| ms.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.backoff);

        let retention = match env::var("HOPPER_DELETE_ON_READ").as_deref() {
            Ok("1") | Ok("true") => PayloadRetention::DeleteOnRead,
            _ => PayloadRetention::Retain,
        };

        Self {
            list_name,
            backoff,
            retention,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_list_name(mut self, list_name: impl Into<String>) -> Self {
        self.list_name = list_name.into();
        self
    }

    pub fn with_retention(mut self, retention: PayloadRetention) -> Self {
        self.retention = retention;
        self
    }
}
