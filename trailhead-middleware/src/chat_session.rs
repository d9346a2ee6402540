//! Chat-session restore (spec §4.2: "Loads prior messages for
//! `request.sessionId` from a Chat Store and concatenates with the newest
//! incoming message ... Writes a live `loader` via
//! `response.writeMessageMetadata`.").

use crate::chat_store::{ChatSession, ChatStore, ChatStoreError};
use async_trait::async_trait;
use std::sync::Arc;
use trailhead_router::{middleware_fn, Middleware};

/// Generates a short session title from its first message. Grounded on the
/// spec's "generates a title ... via an external LM" — the LM call itself
/// is out of scope (spec Non-goals: "the LM invocation API itself"), so
/// this is a pluggable seam rather than a concrete provider call.
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    /// Produce a title for a session whose first message's text is `seed`.
    async fn generate(&self, seed: &str) -> String;
}

/// A [`TitleGenerator`] that truncates the seed text, for tests and
/// configurations that don't wire an LM.
pub struct TruncatingTitleGenerator {
    max_len: usize,
}

impl TruncatingTitleGenerator {
    /// Titles are truncated to at most `max_len` characters.
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }
}

#[async_trait]
impl TitleGenerator for TruncatingTitleGenerator {
    async fn generate(&self, seed: &str) -> String {
        seed.chars().take(self.max_len).collect()
    }
}

/// Build the chat-session restore middleware. On every invocation carrying
/// `request.session_id`:
/// - loads the prior session, if any, and prepends its messages to
///   `request.messages` (deduping by message id — an incoming message that
///   already exists in history replaces the stored copy in place);
/// - if no session exists yet, creates one and generates its title from the
///   first message via `titles`;
/// - persists the merged history back to `store`;
/// - emits a `message-metadata` part with a `loader` field while the
///   restore is in flight.
pub fn chat_session_restore(store: Arc<dyn ChatStore>, titles: Arc<dyn TitleGenerator>) -> impl Middleware {
    middleware_fn(move |ctx, next| {
        let store = store.clone();
        let titles = titles.clone();
        Box::pin(async move {
            let Some(session_id) = ctx.request.session_id.clone() else {
                return next.run(ctx).await;
            };

            let loader_id = ctx
                .request
                .messages
                .last()
                .map(|m| m.id)
                .unwrap_or_else(uuid::Uuid::new_v4);
            ctx.response
                .write_message_metadata(loader_id, serde_json::json!({"loader": "restoring session"}))
                .await;

            let mut session = match store.load(&session_id).await {
                Ok(session) => session,
                Err(ChatStoreError::NotFound(_)) => {
                    let mut session = ChatSession::new(session_id.clone());
                    if let Some(first) = ctx.request.messages.first() {
                        session.title = Some(titles.generate(&first.text()).await);
                    }
                    session
                }
                Err(err) => {
                    ctx.response
                        .write_message_metadata(loader_id, serde_json::json!({"loader": null, "error": err.to_string()}))
                        .await;
                    return next.run(ctx).await;
                }
            };

            for incoming in std::mem::take(&mut ctx.request.messages) {
                match session.messages.iter_mut().find(|m| m.id == incoming.id) {
                    Some(existing) => *existing = incoming,
                    None => session.messages.push(incoming),
                }
            }
            ctx.request.messages = session.messages.clone();
            session.updated_at = chrono::Utc::now();

            let _ = store.save(&session).await;
            ctx.response
                .write_message_metadata(loader_id, serde_json::json!({"loader": null}))
                .await;

            next.run(ctx).await
        })
    })
}
