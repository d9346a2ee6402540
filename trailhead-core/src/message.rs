//! Chat messages: role, parts, and metadata (spec §3 Request/Message).

use crate::part::Part;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of the speaker that produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A human caller.
    User,
    /// The agent's response.
    Assistant,
    /// System-level instructions.
    System,
}

/// Metadata carried alongside a message. `extra` is an open bag merged in
/// place by [`crate::part::Part::MessageMetadata`] parts — used for a live
/// `loader` string while a middleware restores a session, or a terminal
/// `error` string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// When the message was created.
    pub created_at: Option<DateTime<Utc>>,
    /// A path the HTTP front-end should revalidate after this message lands.
    pub revalidate_path: Option<String>,
    /// Free-form attachments (files, citations, ...).
    #[serde(default)]
    pub attachments: serde_json::Value,
    /// Additional fields merged in by `message-metadata` stream parts.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MessageMetadata {
    /// Merge another JSON object's fields into `extra`, overwriting on key
    /// collision — this is how a `message-metadata` part mutates the
    /// enclosing message (spec §3: "merges into the enclosing assistant
    /// message's metadata").
    pub fn merge(&mut self, fields: &serde_json::Value) {
        if let serde_json::Value::Object(map) = fields {
            for (k, v) in map {
                self.extra.insert(k.clone(), v.clone());
            }
        }
    }
}

/// A single message in a [`crate::request::Request`]'s history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Stable identifier, shared by every [`Part`] that belongs to this
    /// message.
    pub id: Uuid,
    /// Who produced the message.
    pub role: Role,
    /// The message's content, as an ordered sequence of parts.
    pub parts: Vec<Part>,
    /// Out-of-band metadata.
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    /// Construct a new message with a fresh id and no parts.
    pub fn new(role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            parts: Vec::new(),
            metadata: MessageMetadata::default(),
        }
    }

    /// Construct a user message carrying a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::User);
        let id = msg.id;
        msg.parts.push(Part::Text {
            message_id: id,
            delta: text.into(),
        });
        msg
    }

    /// Concatenate every `Part::Text` delta belonging to this message.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { delta, .. } => Some(delta.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_text_builds_a_single_text_part() {
        let msg = Message::user_text("hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "hello");
        assert_eq!(msg.parts.len(), 1);
    }

    #[test]
    fn merge_overwrites_on_key_collision() {
        let mut meta = MessageMetadata::default();
        meta.merge(&serde_json::json!({"loader": "restoring session"}));
        meta.merge(&serde_json::json!({"loader": "done", "error": null}));
        assert_eq!(
            meta.extra.get("loader").unwrap(),
            &serde_json::json!("done")
        );
        assert!(meta.extra.contains_key("error"));
    }
}
