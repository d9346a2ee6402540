//! The middleware chain: [`Middleware`] and [`Next`] (spec §4.2).
//!
//! Shape is lifted directly from `neuron-tool::middleware::{ToolMiddleware,
//! Next}` — `Next` borrows the remaining middleware slice plus the terminal
//! handler and is consumed on call, so calling it twice is a compile error
//! rather than the `MiddlewareReentry` runtime fault the spec anticipates
//! for non-Rust hosts.

use crate::agent::Agent;
use crate::context::Context;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use trailhead_core::TrailheadError;

/// A boxed, `Send` future — the manual equivalent of what `async_trait`
/// generates, used by [`middleware_fn`] to adapt a plain closure.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A function of `(context, next)` that may mutate `context` before and
/// after calling `next`, and MUST call `next` zero or one times (spec
/// §4.2).
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Run this middleware. Call `next.run(ctx)` to continue the chain, or
    /// return without calling it to short-circuit (already-written stream
    /// parts are preserved either way).
    async fn process(
        &self,
        ctx: &mut Context,
        next: Next<'_>,
    ) -> Result<Option<serde_json::Value>, TrailheadError>;
}

/// The remaining middleware chain plus the terminal [`Agent`]. Consumed on
/// [`Next::run`] to make reentry a compile error.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Agent,
}

impl<'a> Next<'a> {
    pub(crate) fn new(middlewares: &'a [Arc<dyn Middleware>], terminal: &'a dyn Agent) -> Self {
        Self { middlewares, terminal }
    }

    /// Continue the chain: run the next middleware, or the terminal agent
    /// once the chain is exhausted.
    pub async fn run(self, ctx: &mut Context) -> Result<Option<serde_json::Value>, TrailheadError> {
        match self.middlewares.split_first() {
            Some((head, tail)) => {
                let next = Next::new(tail, self.terminal);
                head.process(ctx, next).await
            }
            None => self.terminal.call(ctx).await,
        }
    }
}

struct MiddlewareFn<F> {
    f: F,
}

#[async_trait]
impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Result<Option<serde_json::Value>, TrailheadError>>
        + Send
        + Sync,
{
    async fn process(
        &self,
        ctx: &mut Context,
        next: Next<'_>,
    ) -> Result<Option<serde_json::Value>, TrailheadError> {
        (self.f)(ctx, next).await
    }
}

/// Adapt a closure returning a boxed future into a [`Middleware`] (mirrors
/// `neuron-tool::middleware::tool_middleware_fn`).
///
/// ```ignore
/// let mw = middleware_fn(|ctx, next| Box::pin(async move {
///     ctx.logger.info("before");
///     let result = next.run(ctx).await;
///     result
/// }));
/// ```
pub fn middleware_fn<F>(f: F) -> impl Middleware
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Result<Option<serde_json::Value>, TrailheadError>>
        + Send
        + Sync
        + 'static,
{
    MiddlewareFn { f }
}
