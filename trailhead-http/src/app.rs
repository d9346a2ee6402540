//! Axum app: route table (spec §6 External Interfaces). Grounded on
//! `hi-youichi-loom/serve::app`'s `router(state) -> Router` shape, widened
//! from a single websocket route to the full `/chat`, `/agent/<path>`,
//! `/workflows/*`, `/workers/*` surface.

use axum::routing::{get, post};
use axum::Router as AxumRouter;

use crate::agent::agent_handler;
use crate::chat::chat_handler;
use crate::state::AppState;
use crate::workers::{callback_handler, dispatch_handler, job_handler};
use crate::workflows::{orchestrate_handler, signal_handler, status_handler};

/// Build the axum router over `state`.
pub fn router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/chat", post(chat_handler))
        .route("/agent/*path", post(agent_handler))
        .route("/workflows/orchestrate", post(orchestrate_handler))
        .route("/workflows/status", get(status_handler))
        .route("/workflows/signal", post(signal_handler))
        .route("/workers/jobs/:job_id", get(job_handler))
        .route("/workers/callback", post(callback_handler))
        .route("/workers/:id", post(dispatch_handler))
        .with_state(state)
}
