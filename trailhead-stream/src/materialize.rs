//! Materializing a stream into a single response payload, for callers that
//! are not streaming consumers (spec §4.1 `toAwaitResponse`).

use crate::writer::ResponseStream;
use serde::{Deserialize, Serialize};
use trailhead_core::{ErrorPayload, Part, ToolState};
use uuid::Uuid;

/// One tool call's accumulated result, as seen by a materialized caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializedToolCall {
    /// The message this call belongs to.
    pub message_id: Uuid,
    /// The call's id.
    pub tool_call_id: String,
    /// The tool's name.
    pub name: String,
    /// Final lifecycle state.
    pub state: ToolState,
    /// Input, once available.
    pub input: Option<serde_json::Value>,
    /// Output, once available.
    pub output: Option<serde_json::Value>,
    /// Error, if the call failed.
    pub error: Option<String>,
}

/// The materialized form of an entire response stream: terminal text, every
/// tool call's accumulated result, structured data payloads, and the
/// terminal error if the stream ended that way (spec §4.1
/// `toAwaitResponse`: "materialize the Stream into a single response
/// payload").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwaitResponse {
    /// Concatenated text across every `text` part, in emission order.
    pub text: String,
    /// Every tool call seen, keyed by `tool_call_id`, most-recent state won.
    pub tool_calls: Vec<MaterializedToolCall>,
    /// Every `data-<name>` payload emitted, in emission order.
    pub data: Vec<(String, serde_json::Value)>,
    /// The terminal error, if the stream ended in one rather than `finish`.
    pub error: Option<ErrorPayload>,
    /// Every part observed, for callers that need the raw sequence.
    pub parts: Vec<Part>,
}

impl AwaitResponse {
    /// True if the stream ended in an `error` part rather than `finish`.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Fold one part into an in-progress [`AwaitResponse`], returning whether
/// the part was terminal (`finish`/`error`). Factored out of [`materialize`]
/// so callers that need to *both* forward a part live and accumulate a
/// summary — `callAgent(..., { streamToUI: true })` — don't have to drain
/// the stream twice or duplicate this matching.
///
/// Tool-call lookups are by `(message_id, tool_call_id)`, scanning
/// `result.tool_calls` rather than keeping a side index, since a single
/// accumulation is bounded by one invocation's tool-call count.
pub fn accumulate(result: &mut AwaitResponse, part: &Part) -> bool {
    match part {
        Part::Text { delta, .. } => result.text.push_str(delta),
        Part::Tool {
            message_id,
            tool_call_id,
            name,
            state,
            input,
            output,
            error,
        } => {
            let existing = result
                .tool_calls
                .iter_mut()
                .find(|call| call.tool_call_id == *tool_call_id && call.message_id == *message_id);
            match existing {
                Some(call) => {
                    call.state = *state;
                    if input.is_some() {
                        call.input = input.clone();
                    }
                    if output.is_some() {
                        call.output = output.clone();
                    }
                    if error.is_some() {
                        call.error = error.clone();
                    }
                }
                None => result.tool_calls.push(MaterializedToolCall {
                    message_id: *message_id,
                    tool_call_id: tool_call_id.clone(),
                    name: name.clone(),
                    state: *state,
                    input: input.clone(),
                    output: output.clone(),
                    error: error.clone(),
                }),
            }
        }
        Part::Data { name, payload, .. } => {
            result.data.push((name.clone(), payload.clone()));
        }
        Part::Error { message, stack, .. } => {
            result.error = Some(ErrorPayload {
                message: message.clone(),
                name: None,
                stack: stack.clone(),
            });
        }
        _ => {}
    }
    let terminal = part.is_terminal();
    result.parts.push(part.clone());
    terminal
}

/// Drain `stream` into an [`AwaitResponse`]. Used by `toAwaitResponse` and
/// by `agentAsTool`'s `execute` to collect a sub-agent's result without
/// merging it into the caller's own stream.
pub async fn materialize(mut stream: ResponseStream) -> AwaitResponse {
    let mut result = AwaitResponse::default();
    while let Some(part) = stream.next_part().await {
        if accumulate(&mut result, &part) {
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::channel;

    #[tokio::test]
    async fn materialize_concatenates_text_and_stops_at_finish() {
        let (w, r) = channel(8);
        let id = Uuid::new_v4();
        w.start(id).await;
        w.text(id, "hello ").await;
        w.text(id, "world").await;
        w.finish(id).await;
        let result = materialize(r).await;
        assert_eq!(result.text, "hello world");
        assert!(!result.is_error());
    }

    #[tokio::test]
    async fn materialize_tracks_tool_call_lifecycle() {
        let (w, r) = channel(8);
        let id = Uuid::new_v4();
        w.tool(id, "call-1", "sum", ToolState::InputAvailable, Some(serde_json::json!({"a":1})), None, None)
            .await;
        w.tool(
            id,
            "call-1",
            "sum",
            ToolState::OutputAvailable,
            None,
            Some(serde_json::json!({"result": 2})),
            None,
        )
        .await;
        w.finish(id).await;
        let result = materialize(r).await;
        assert_eq!(result.tool_calls.len(), 1);
        let call = &result.tool_calls[0];
        assert_eq!(call.state, ToolState::OutputAvailable);
        assert_eq!(call.output, Some(serde_json::json!({"result": 2})));
    }

    #[tokio::test]
    async fn materialize_captures_terminal_error() {
        let (w, r) = channel(8);
        let id = Uuid::new_v4();
        w.text(id, "partial").await;
        w.error(id, "boom", None).await;
        let result = materialize(r).await;
        assert!(result.is_error());
        assert_eq!(result.error.unwrap().message, "boom");
    }
}
