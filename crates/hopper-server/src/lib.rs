//! # Hopper Server
//!
//! HTTP front end for Hopper queues. Producers POST job payloads; the same
//! process runs the worker pool that drains them.
//!
//! Routes:
//! - `GET /health`
//! - `POST /hash[?delay_secs=N]` with a [`HashJob`](jobs::HashJob) body
//! - `POST /greeting[?delay_secs=N]` with a [`Greeting`](jobs::Greeting) body

pub mod config;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use server::HopperServer;
pub use state::AppState;
