//! The [`Agent`] trait: a handler registered at a path (spec §4.1 `agent`).

use crate::context::Context;
use async_trait::async_trait;
use trailhead_core::TrailheadError;

/// A handler registered at a path. Receives a [`Context`] and may write to
/// `ctx.response` and/or return a value, which is surfaced to callers as a
/// `Part::Data { name: "$return", .. }` part (see [`crate::RETURN_DATA_NAME`]).
#[async_trait]
pub trait Agent: Send + Sync {
    /// Run this agent against `ctx`.
    async fn call(&self, ctx: &mut Context) -> Result<Option<serde_json::Value>, TrailheadError>;
}

/// Adapt a plain async closure into an [`Agent`], for handlers that don't
/// warrant a named type.
pub fn agent_fn<F>(f: F) -> impl Agent
where
    F: for<'a> Fn(
            &'a mut Context,
        )
            -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Option<serde_json::Value>, TrailheadError>> + Send + 'a>>
        + Send
        + Sync,
{
    AgentFn { f }
}

struct AgentFn<F> {
    f: F,
}

#[async_trait]
impl<F> Agent for AgentFn<F>
where
    F: for<'a> Fn(
            &'a mut Context,
        )
            -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Option<serde_json::Value>, TrailheadError>> + Send + 'a>>
        + Send
        + Sync,
{
    async fn call(&self, ctx: &mut Context) -> Result<Option<serde_json::Value>, TrailheadError> {
        (self.f)(ctx).await
    }
}
