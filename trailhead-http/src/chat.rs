//! `POST /chat` (spec §6: `router.handle('/', { request: { messages,
//! params } })`, "response body is a media-typed event stream of Message
//! Parts"). Served as Server-Sent Events rather than the teacher's
//! websocket transport (`hi-youichi-loom/serve`), since spec §9 calls for
//! "SSE/chunked body for `/chat`" specifically.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::Deserialize;
use std::convert::Infallible;

use trailhead_core::{Bag, Message, Path, Request};

use crate::state::AppState;

/// Inbound `/chat` body.
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    /// Ordered message history, newest last.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Caller-supplied parameters, forwarded as `Request::params`.
    #[serde(default)]
    pub params: Bag,
    /// Session id, consumed by chat-session-restore middleware when
    /// mounted on the root path.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Stream the root agent's response as Server-Sent Events, one event per
/// [`trailhead_core::Part`].
pub async fn chat_handler(State(state): State<AppState>, Json(body): Json<ChatRequestBody>) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let mut request = Request::with_messages(Path::root(), body.messages);
    request.params = body.params;
    request.session_id = body.session_id;

    let stream = state.router.handle(Path::root(), request);
    let events = futures::stream::unfold(stream, |mut stream| async move {
        let part = stream.next_part().await?;
        let event = Event::default().json_data(&part).unwrap_or_else(|_| Event::default().data("{\"type\":\"error\",\"message\":\"part serialization failed\"}"));
        Some((Ok(event), stream))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
