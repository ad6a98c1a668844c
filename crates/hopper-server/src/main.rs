//! Hopper Server - standalone entry point
//!
//! Loads `.env` if present, connects to Redis and serves the API together
//! with the queue workers until Ctrl+C or SIGTERM.

use anyhow::Result;
use hopper_server::{HopperServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    hopper_server::server::init_tracing();

    if let Err(e) = dotenv {
        if !e.not_found() {
            tracing::warn!(error = %e, "Ignoring unreadable .env file");
        }
    }

    tracing::info!("Starting Hopper server...");

    let config = ServerConfig::from_env();
    tracing::info!(
        workers = config.workers,
        list = %config.queue.list_name,
        "Loaded configuration"
    );

    let server = HopperServer::new(config).await.map_err(|e| {
        tracing::error!("Failed to initialize server: {}", e);
        e
    })?;

    server.run().await.map_err(|e| {
        tracing::error!("Server error during execution: {}", e);
        e
    })?;

    Ok(())
}
