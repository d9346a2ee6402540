//! The `ChatStore` port used by [`crate::chat_session::chat_session_restore`]
//! (spec §4.2 "Chat-session restore").
//!
//! Grounded on `agent-runtime::session::SessionStorage`: the same
//! `save`/`load`/`list`/`delete` shape, `InMemoryChatStore` mirroring
//! `InMemorySessionStorage` (a `RwLock<HashMap<..>>`), and `FileChatStore`
//! mirroring `FileSessionStorage`'s one-JSON-file-per-session layout and its
//! `tokio::fs` `NotFound`-vs-`Io` error mapping. Widened to `async_trait`
//! rather than the teacher's return-position-`impl Future`, to match the
//! rest of the workspace's seam convention.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use trailhead_core::Message;

/// Failures a [`ChatStore`] backend can report.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ChatStoreError {
    /// No session exists under the given id.
    #[error("chat session not found: {0}")]
    NotFound(String),

    /// The backend's underlying I/O failed.
    #[error("chat store io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored session payload didn't deserialize.
    #[error("chat store serialization error: {0}")]
    Serialization(String),

    /// Catch-all for anything else.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A persisted conversation, keyed by `session_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// The session id, unique within a store.
    pub id: String,
    /// The full message history, oldest first.
    pub messages: Vec<Message>,
    /// A short, LM-generated title for the session.
    pub title: Option<String>,
    /// When the session was first created.
    pub created_at: DateTime<Utc>,
    /// When the session was last saved.
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Start a new, empty session.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: Vec::new(),
            title: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A lightweight summary, omitting the message history.
    pub fn summary(&self) -> ChatSessionSummary {
        ChatSessionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            message_count: self.messages.len(),
        }
    }
}

/// A [`ChatSession`] without its message history, for listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSessionSummary {
    /// The session id.
    pub id: String,
    /// The session's title, if one has been generated.
    pub title: Option<String>,
    /// When the session was first created.
    pub created_at: DateTime<Utc>,
    /// When the session was last saved.
    pub updated_at: DateTime<Utc>,
    /// How many messages the session holds.
    pub message_count: usize,
}

/// Persists and retrieves chat sessions (spec §4.2 "Chat Store").
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Save a session, creating or overwriting it.
    async fn save(&self, session: &ChatSession) -> Result<(), ChatStoreError>;

    /// Load a session by id.
    async fn load(&self, id: &str) -> Result<ChatSession, ChatStoreError>;

    /// List every session's summary.
    async fn list(&self) -> Result<Vec<ChatSessionSummary>, ChatStoreError>;

    /// Delete a session by id.
    async fn delete(&self, id: &str) -> Result<(), ChatStoreError>;
}

/// An in-memory [`ChatStore`], suitable for tests and short-lived processes.
#[derive(Clone, Default)]
pub struct InMemoryChatStore {
    sessions: Arc<RwLock<HashMap<String, ChatSession>>>,
}

impl InMemoryChatStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn save(&self, session: &ChatSession) -> Result<(), ChatStoreError> {
        let mut map = self.sessions.write().await;
        map.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<ChatSession, ChatStoreError> {
        let map = self.sessions.read().await;
        map.get(id)
            .cloned()
            .ok_or_else(|| ChatStoreError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<ChatSessionSummary>, ChatStoreError> {
        let map = self.sessions.read().await;
        Ok(map.values().map(ChatSession::summary).collect())
    }

    async fn delete(&self, id: &str) -> Result<(), ChatStoreError> {
        let mut map = self.sessions.write().await;
        map.remove(id)
            .ok_or_else(|| ChatStoreError::NotFound(id.to_string()))?;
        Ok(())
    }
}

/// A [`ChatStore`] backed by one JSON file per session under `directory`.
#[derive(Clone)]
pub struct FileChatStore {
    directory: PathBuf,
}

impl FileChatStore {
    /// Store sessions under `directory`, creating it lazily on first save.
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.directory.join(format!("{id}.json"))
    }
}

#[async_trait]
impl ChatStore for FileChatStore {
    async fn save(&self, session: &ChatSession) -> Result<(), ChatStoreError> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| ChatStoreError::Serialization(e.to_string()))?;
        tokio::fs::write(self.path_for(&session.id), json).await?;
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<ChatSession, ChatStoreError> {
        let path = self.path_for(id);
        let data = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ChatStoreError::NotFound(id.to_string())
            } else {
                ChatStoreError::Io(e)
            }
        })?;
        serde_json::from_str(&data).map_err(|e| ChatStoreError::Serialization(e.to_string()))
    }

    async fn list(&self) -> Result<Vec<ChatSessionSummary>, ChatStoreError> {
        let mut summaries = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(summaries),
            Err(e) => return Err(ChatStoreError::Io(e)),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let data = tokio::fs::read_to_string(&path).await?;
                if let Ok(session) = serde_json::from_str::<ChatSession>(&data) {
                    summaries.push(session.summary());
                }
            }
        }
        Ok(summaries)
    }

    async fn delete(&self, id: &str) -> Result<(), ChatStoreError> {
        let path = self.path_for(id);
        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ChatStoreError::NotFound(id.to_string())
            } else {
                ChatStoreError::Io(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_round_trips_a_session() {
        let store = InMemoryChatStore::new();
        let session = ChatSession::new("s-1");
        store.save(&session).await.unwrap();
        let loaded = store.load("s-1").await.unwrap();
        assert_eq!(loaded.id, "s-1");
        assert_eq!(store.list().await.unwrap().len(), 1);
        store.delete("s-1").await.unwrap();
        assert!(matches!(store.load("s-1").await, Err(ChatStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn file_store_round_trips_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChatStore::new(dir.path().to_path_buf());
        let session = ChatSession::new("s-2");
        store.save(&session).await.unwrap();

        let reopened = FileChatStore::new(dir.path().to_path_buf());
        let loaded = reopened.load("s-2").await.unwrap();
        assert_eq!(loaded.id, "s-2");
    }

    #[tokio::test]
    async fn file_store_missing_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChatStore::new(dir.path().to_path_buf());
        assert!(matches!(store.load("absent").await, Err(ChatStoreError::NotFound(_))));
    }
}
