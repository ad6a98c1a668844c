//! Hopper server: HTTP listener and queue workers with one shared shutdown

use axum::Router;
use hopper_queue::{Broker, QueueHandler, RedisBroker};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::jobs;
use crate::routes::api_router;
use crate::state::AppState;

pub struct HopperServer {
    config: ServerConfig,
    app_state: AppState,
}

impl HopperServer {
    /// Connect to Redis and register the built-in queues.
    ///
    /// A broker that cannot be reached is fatal: nothing can be enqueued or
    /// processed without it.
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let broker = RedisBroker::connect(&config.redis_url).await?;
        tracing::info!(redis_url = %config.redis_url, "Connected to Redis");
        Self::with_broker(config, Arc::new(broker))
    }

    /// Build a server over any broker
    pub fn with_broker(config: ServerConfig, broker: Arc<dyn Broker>) -> anyhow::Result<Self> {
        let mut handler = QueueHandler::new_with_arc(broker, config.queue.clone());
        jobs::register_all(&mut handler)?;

        let app_state = AppState::new(Arc::new(handler));
        Ok(Self { config, app_state })
    }

    /// Get the configured router
    pub fn router(&self) -> Router {
        api_router(self.app_state.clone())
            .layer(RequestBodyLimitLayer::new(self.config.max_body_size))
            .layer(TimeoutLayer::new(self.config.timeout))
            .layer(TraceLayer::new_for_http())
    }

    pub fn state(&self) -> &AppState {
        &self.app_state
    }

    /// Run until Ctrl+C / SIGTERM
    pub async fn run(self) -> anyhow::Result<()> {
        let shutdown = CancellationToken::new();
        tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                shutdown_signal().await;
                shutdown.cancel();
            }
        });
        self.run_until(shutdown).await
    }

    /// Serve HTTP and run the workers until `shutdown` is cancelled.
    ///
    /// Both halves watch the same token; this returns once the listener has
    /// drained and every worker has stopped.
    pub async fn run_until(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = self.router();
        let addr = self.config.addr;

        let workers = tokio::spawn(
            self.app_state
                .queue()
                .run(self.config.workers, shutdown.clone()),
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Hopper listening on http://{}", addr);

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .await;

        // Stop the workers as well if the listener failed on its own
        shutdown.cancel();
        workers.await??;
        served?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Initialize tracing subscriber
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,hopper_queue=debug,hopper_server=debug,tower_http=debug")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
