//! Stream parts: the typed units written to a [`Response`](crate::Response)
//! stream (spec §3).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a `tool-<name>` part as the call progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    /// The tool call's input is still streaming in.
    InputStreaming,
    /// The input is complete and the tool is about to run / running.
    InputAvailable,
    /// The tool produced a result.
    OutputAvailable,
    /// The tool call failed.
    Error,
}

/// A single typed unit written to a response stream. Every variant carries
/// `message_id` so a reader can group parts into messages (spec §3).
///
/// `type` is a generalization of the spec's `tool-<name>` / `data-<name>`
/// family tags: the tool/data name is carried as a field (`name`) rather
/// than folded into the serde tag, which keeps the enum closed while still
/// letting callers discriminate on `name` the way the spec's dynamic tag
/// would.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    /// A plain text delta.
    Text {
        /// The enclosing message.
        message_id: Uuid,
        /// The text fragment.
        delta: String,
    },

    /// A tool invocation marker (`tool-<name>` in the spec).
    Tool {
        /// The enclosing message.
        message_id: Uuid,
        /// Stable id for this specific tool call.
        tool_call_id: String,
        /// The tool's name (what the spec folds into the part's tag).
        name: String,
        /// Where the call is in its lifecycle.
        state: ToolState,
        /// Input arguments, once available.
        input: Option<serde_json::Value>,
        /// Output, once available.
        output: Option<serde_json::Value>,
        /// Error message, if `state == Error`.
        error: Option<String>,
    },

    /// A UI-bearing tool result (`tool-ui-<name>` in the spec).
    ToolUi {
        /// The enclosing message.
        message_id: Uuid,
        /// The tool's name.
        name: String,
        /// Arbitrary UI payload.
        payload: serde_json::Value,
    },

    /// Arbitrary structured data (`data-<name>` in the spec).
    Data {
        /// The enclosing message.
        message_id: Uuid,
        /// The data channel's name.
        name: String,
        /// The payload.
        payload: serde_json::Value,
    },

    /// Merges `fields` into the enclosing assistant message's metadata —
    /// used for a live `loader` string or an error string that doesn't
    /// terminate the stream.
    MessageMetadata {
        /// The enclosing message.
        message_id: Uuid,
        /// Fields to merge into `Message::metadata.extra`.
        fields: serde_json::Value,
    },

    /// A terminal error payload.
    Error {
        /// The enclosing message.
        message_id: Uuid,
        /// Human-readable error message.
        message: String,
        /// Stack trace, only ever populated in development.
        stack: Option<String>,
    },

    /// Sentinel marking the start of a message.
    Start {
        /// The message that is starting.
        message_id: Uuid,
    },

    /// Sentinel marking the end of a message / stream.
    Finish {
        /// The message that finished.
        message_id: Uuid,
    },
}

impl Part {
    /// The `message_id` carried by every variant.
    pub fn message_id(&self) -> Uuid {
        match self {
            Part::Text { message_id, .. }
            | Part::Tool { message_id, .. }
            | Part::ToolUi { message_id, .. }
            | Part::Data { message_id, .. }
            | Part::MessageMetadata { message_id, .. }
            | Part::Error { message_id, .. }
            | Part::Start { message_id }
            | Part::Finish { message_id } => *message_id,
        }
    }

    /// True for the two sentinel variants that bookend a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Part::Finish { .. } | Part::Error { .. })
    }
}
