//! `POST /agent/<path>` (spec §6: `router.toAwaitResponse('<path>', {
//! request })`, "response is the materialized JSON of the stream").

use axum::extract::{Path as AxumPath, State};
use axum::Json;
use serde::Deserialize;

use trailhead_core::{Bag, Message, Path, Request};
use trailhead_stream::AwaitResponse;

use crate::state::AppState;

/// Inbound `/agent/<path>` body — the same shape `/chat` accepts, since
/// both ultimately build a [`Request`] for the router.
#[derive(Debug, Deserialize)]
pub struct AgentRequestBody {
    /// Ordered message history, newest last.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Caller-supplied parameters.
    #[serde(default)]
    pub params: Bag,
    /// Session id, consumed by chat-session-restore middleware.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Drive `path` to completion and return the materialized response.
pub async fn agent_handler(State(state): State<AppState>, AxumPath(path): AxumPath<String>, Json(body): Json<AgentRequestBody>) -> Json<AwaitResponse> {
    let target = Path::new(path);
    let mut request = Request::with_messages(target.clone(), body.messages);
    request.params = body.params;
    request.session_id = body.session_id;

    Json(state.router.to_await_response(target, request).await)
}
