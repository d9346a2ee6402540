//! The inbound `Request` and the generic key/value bags used for `params`
//! and per-invocation `state` (spec §3).

use crate::message::Message;
use crate::path::Path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A typed bag of arbitrary key/value pairs. Used both for `Request::params`
/// (caller-supplied) and [`crate::Context::state`] (computed along the
/// middleware chain).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bag(HashMap<String, serde_json::Value>);

impl Bag {
    /// An empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a typed value, serializing it to JSON.
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        if let Ok(json) = serde_json::to_value(value) {
            self.0.insert(key.into(), json);
        }
    }

    /// Fetch and deserialize a value, if present and well-formed.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.0.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Fetch the raw JSON value.
    pub fn get_raw(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Remove a key, returning its raw value if present.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    /// True if the bag has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An inbound invocation: the path being addressed, the message history,
/// caller-supplied params, and an optional session id for chat-session
/// restore middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// The path this request addresses.
    pub path: Path,
    /// Ordered message history, newest last.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Caller-supplied parameters.
    #[serde(default)]
    pub params: Bag,
    /// Session identifier, used by chat-session restore middleware.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl Request {
    /// Construct a request addressed at `path` with no history.
    pub fn new(path: impl Into<Path>) -> Self {
        Self {
            path: path.into(),
            messages: Vec::new(),
            params: Bag::new(),
            session_id: None,
        }
    }

    /// Construct a request carrying the given message history.
    pub fn with_messages(path: impl Into<Path>, messages: Vec<Message>) -> Self {
        Self {
            path: path.into(),
            messages,
            params: Bag::new(),
            session_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bag_roundtrips_typed_values() {
        let mut bag = Bag::new();
        bag.insert("count", 3u32);
        assert_eq!(bag.get::<u32>("count"), Some(3));
        assert_eq!(bag.get::<u32>("missing"), None);
    }

    #[test]
    fn request_defaults_to_empty_history() {
        let req = Request::new("/echo");
        assert!(req.messages.is_empty());
        assert!(req.params.is_empty());
    }
}
