//! `/workers/*` (spec §6): dispatching a worker, polling its job, and
//! receiving the completion webhook.

use axum::extract::{Path as AxumPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use trailhead_core::{ErrorPayload, JobRecord};
use trailhead_worker::DispatchOptions;

use crate::state::AppState;

/// `POST /workers/<id>` body.
#[derive(Debug, Default, Deserialize)]
pub struct DispatchRequest {
    /// The worker's input.
    #[serde(default)]
    pub input: serde_json::Value,
    /// Reuse this id instead of minting a fresh one (idempotent dispatch).
    #[serde(default)]
    pub job_id: Option<String>,
    /// Posted with the final job record once it reaches a terminal status.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Opaque metadata stored on the job record.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// `{ jobId, status, statusUrl }` (spec §6 `POST /workers/<id>`).
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    /// The dispatched job's id.
    pub job_id: String,
    /// Its status immediately after dispatch (`queued` or `running`).
    pub status: trailhead_core::JobStatus,
    /// Where a caller can poll for the job's current state.
    pub status_url: String,
}

/// Dispatch `id` with the request body's input.
pub async fn dispatch_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<DispatchRequest>,
) -> Result<Json<DispatchResponse>, StatusCode> {
    let opts = DispatchOptions { mode: Some(trailhead_worker::DispatchMode::Local), webhook_url: body.webhook_url, job_id: body.job_id, metadata: body.metadata };
    let record = state.workers.dispatch(&id, body.input, opts).await.map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(Json(DispatchResponse {
        job_id: record.job_id.clone(),
        status: record.status,
        status_url: format!("/workers/jobs/{}", record.job_id),
    }))
}

/// `GET /workers/jobs/<jobId>`.
pub async fn job_handler(State(state): State<AppState>, AxumPath(job_id): AxumPath<String>) -> Result<Json<JobRecord>, StatusCode> {
    let record = state.workers.job_store().get(&job_id).await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    record.map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// `POST /workers/callback` body (spec §6: `{ jobId, workerId, status,
/// output?, error?, metadata? }`) — a remote worker reporting completion
/// back to this process.
#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    /// The job this callback reports on.
    pub job_id: String,
    /// Final status.
    pub status: trailhead_core::JobStatus,
    /// The worker's output, once completed.
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    /// The worker's error, once failed.
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

/// Apply a remote worker's completion callback, verifying
/// `x-webhook-signature` against `WEBHOOK_SECRET` when configured (spec §6:
/// "on mismatch returns `401`").
pub async fn callback_handler(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> StatusCode {
    if let Some(secret) = &state.config.webhook_secret {
        let signature = headers.get("x-webhook-signature").and_then(|v| v.to_str().ok()).unwrap_or("");
        if !trailhead_worker::verify_webhook_signature(secret, &body, signature) {
            return StatusCode::UNAUTHORIZED;
        }
    }

    let callback: CallbackBody = match serde_json::from_slice(&body) {
        Ok(b) => b,
        Err(_) => return StatusCode::BAD_REQUEST,
    };

    let update = trailhead_core::JobUpdate { status: Some(callback.status), output: callback.output, error: callback.error, ..Default::default() };
    match state.workers.job_store().update(&callback.job_id, update).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::NOT_FOUND,
    }
}
