#![deny(missing_docs)]
//! Built-in middlewares for the Trailhead router (spec §4.2): context
//! limiting, only-text projection, and chat-session restore.

mod chat_session;
mod chat_store;
mod context_limiter;
mod only_text;

pub use chat_session::{chat_session_restore, TitleGenerator, TruncatingTitleGenerator};
pub use chat_store::{ChatSession, ChatSessionSummary, ChatStore, ChatStoreError, FileChatStore, InMemoryChatStore};
pub use context_limiter::context_limiter;
pub use only_text::{only_text_projection, ONLY_TEXT_MESSAGES_KEY};
