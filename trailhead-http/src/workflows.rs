//! `/workflows/*` (spec §6): starting an orchestration, polling its status,
//! and resuming a paused hook.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use trailhead_orch::adapter::{PendingHook, RunStatus};
use trailhead_orch::engine::WorkflowRegistry;

use crate::state::AppState;

/// `POST /workflows/orchestrate` body: the workflow to run and its input.
#[derive(Debug, Deserialize)]
pub struct OrchestrateRequest {
    /// The id a [`trailhead_orch::engine::MapWorkflowRegistry`] registered
    /// the target [`trailhead_orch::OrchestrationConfig`] under.
    pub workflow_id: String,
    /// The value the run starts with.
    #[serde(default)]
    pub input: serde_json::Value,
}

/// `{ runId, status }` (spec §6 `POST /workflows/orchestrate`).
#[derive(Debug, Serialize)]
pub struct RunStartedResponse {
    /// The adapter-assigned run id.
    pub run_id: String,
    /// The run's status immediately after starting.
    pub status: RunStatus,
}

/// Start `body.workflow_id` with `body.input` in the background and return
/// its run id immediately; callers poll `GET /workflows/status`.
pub async fn orchestrate_handler(State(state): State<AppState>, Json(body): Json<OrchestrateRequest>) -> Result<Json<RunStartedResponse>, StatusCode> {
    let config = state.workflows.get(&body.workflow_id).ok_or(StatusCode::NOT_FOUND)?;
    let run_id = state.engine.clone().start(config, body.input).await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let status = state.engine.status(&run_id).await.map(|s| s.status).unwrap_or_default();
    Ok(Json(RunStartedResponse { run_id, status }))
}

/// `GET /workflows/status?runId=<id>` query.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// The run to query.
    pub run_id: String,
}

/// `{ runId, status, result?, error?, hook? }` (spec §6 `GET
/// /workflows/status`).
#[derive(Debug, Serialize)]
pub struct RunStatusResponse {
    /// The run this snapshot describes.
    pub run_id: String,
    /// Coarse status.
    pub status: RunStatus,
    /// The final result, once completed.
    pub result: Option<serde_json::Value>,
    /// The terminal error, once failed.
    pub error: Option<trailhead_core::ErrorPayload>,
    /// The hook a paused-on-hook run is waiting on.
    pub hook: Option<PendingHook>,
}

/// Report a run's current status.
pub async fn status_handler(State(state): State<AppState>, Query(query): Query<StatusQuery>) -> Result<Json<RunStatusResponse>, StatusCode> {
    let snapshot = state.engine.status(&query.run_id).await.map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(RunStatusResponse {
        run_id: query.run_id,
        status: snapshot.status,
        result: snapshot.result,
        error: snapshot.error,
        hook: snapshot.hook,
    }))
}

/// `POST /workflows/signal` body.
///
/// spec §6 describes this as `{ token, payload }`; resuming a specific
/// [`trailhead_orch::DurableAdapter`] hook also needs the run id, so this
/// server widens the body to include it rather than maintaining a global
/// token index (the HTTP front-end is explicitly illustrative, spec §6 —
/// see DESIGN.md).
#[derive(Debug, Deserialize)]
pub struct SignalRequest {
    /// The run the hook belongs to.
    pub run_id: String,
    /// The hook token being resumed.
    pub token: String,
    /// The payload delivered to the paused `hook` step.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Deliver a resume payload to a paused hook. This only signals the
/// adapter — the run's original driver (started by `orchestrate_handler`,
/// still parked inside `await_hook`) picks the payload up and drives the
/// rest of the step graph itself, so this handler does not re-run any
/// steps. Poll `GET /workflows/status` for the eventual outcome.
pub async fn signal_handler(State(state): State<AppState>, Json(body): Json<SignalRequest>) -> Result<Json<RunStartedResponse>, StatusCode> {
    state.engine.resume(&body.run_id, &body.token, body.payload).await.map_err(|_| StatusCode::NOT_FOUND)?;
    let status = state.engine.status(&body.run_id).await.map(|s| s.status).unwrap_or(RunStatus::Running);
    Ok(Json(RunStartedResponse { run_id: body.run_id, status }))
}
