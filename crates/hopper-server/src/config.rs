//! Server configuration

use hopper_queue::QueueConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub addr: SocketAddr,
    /// Redis connection URL
    pub redis_url: String,
    /// Number of queue workers
    pub workers: usize,
    /// Request timeout
    pub timeout: Duration,
    /// Max request body size (bytes)
    pub max_body_size: usize,
    pub queue: QueueConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            workers: 10,
            timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
            queue: QueueConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    ///
    /// Reads:
    /// - HOPPER_PORT (or PORT): listen port (default: 8080)
    /// - REDIS_URL: broker URL (default: redis://127.0.0.1:6379)
    /// - HOPPER_WORKERS: worker count (default: 10)
    /// - HOPPER_TIMEOUT_SECS: request timeout (default: 30)
    /// - plus the queue settings read by [`QueueConfig::from_env`]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port: u16 = std::env::var("HOPPER_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let redis_url = std::env::var("REDIS_URL").unwrap_or(defaults.redis_url);

        let workers = std::env::var("HOPPER_WORKERS")
            .ok()
            .and_then(|w| w.parse().ok())
            .filter(|w: &usize| *w > 0)
            .unwrap_or(defaults.workers);

        let timeout_secs: u64 = std::env::var("HOPPER_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(30);

        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
            redis_url,
            workers,
            timeout: Duration::from_secs(timeout_secs),
            queue: QueueConfig::from_env(),
            ..defaults
        }
    }
}
