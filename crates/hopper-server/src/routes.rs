//! API routes for enqueueing jobs

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, SubsecRound, Utc};
use hopper_queue::JobPayload;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::jobs::{Greeting, HashJob};
use crate::state::AppState;

/// Longest accepted delay: 30 days
pub const MAX_DELAY_SECS: u64 = 30 * 24 * 60 * 60;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Optional query string on the enqueue routes
#[derive(Debug, Default, Deserialize)]
pub struct EnqueueParams {
    /// Hold the job back for this many seconds
    pub delay_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub status: String,
    pub job_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
}

async fn enqueue<P: JobPayload>(
    state: &AppState,
    params: EnqueueParams,
    payload: &P,
) -> ApiResult<Json<EnqueueResponse>> {
    let queue = state.queue();

    let (job_id, not_before) = match params.delay_secs {
        None | Some(0) => (queue.add_job(payload).await?, None),
        Some(secs) if secs > MAX_DELAY_SECS => {
            return Err(ApiError::BadRequest(format!(
                "delay_secs must be at most {}",
                MAX_DELAY_SECS
            )));
        }
        Some(secs) => {
            let at = (Utc::now() + chrono::Duration::seconds(secs as i64)).trunc_subsecs(0);
            (queue.add_job_with_delay(payload, at).await?, Some(at))
        }
    };

    Ok(Json(EnqueueResponse {
        status: "ok".to_string(),
        job_id,
        not_before,
    }))
}

pub async fn enqueue_hash(
    State(state): State<AppState>,
    Query(params): Query<EnqueueParams>,
    Json(job): Json<HashJob>,
) -> ApiResult<Json<EnqueueResponse>> {
    enqueue(&state, params, &job).await
}

pub async fn enqueue_greeting(
    State(state): State<AppState>,
    Query(params): Query<EnqueueParams>,
    Json(job): Json<Greeting>,
) -> ApiResult<Json<EnqueueResponse>> {
    enqueue(&state, params, &job).await
}

/// Build the API router
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/hash", post(enqueue_hash))
        .route("/greeting", post(enqueue_greeting))
        .with_state(state)
}
