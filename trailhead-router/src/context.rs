//! The per-invocation [`Context`] (spec §3 Context, §4.1).

use crate::logger::Logger;
use crate::router::{CallOptions, CallResult, Router};
use trailhead_core::{Bag, Path, Request};
use trailhead_stream::ResponseWriter;

/// Bundle passed to every agent and middleware: the inbound request, the
/// response stream writer, per-invocation state, a logger, and a handle
/// back to the router for recursive `callAgent` invocations (spec §3: "a
/// `next` proxy for sub-agents").
pub struct Context {
    /// The inbound request. Middlewares may mutate this before `next()`.
    pub request: Request,
    /// The stream writer this invocation writes parts to.
    pub response: ResponseWriter,
    /// Per-invocation computed state (spec §3 State), e.g. a context-limited
    /// view of messages stashed by a middleware for the handler to read.
    pub state: Bag,
    /// Structured logging sink.
    pub logger: Logger,
    router: Router,
}

impl Context {
    /// Construct a context for a fresh invocation of `request` against
    /// `router`, writing through `response`.
    pub fn new(request: Request, response: ResponseWriter, router: Router) -> Self {
        let logger = Logger::for_path(&request.path);
        Self {
            request,
            response,
            state: Bag::new(),
            logger,
            router,
        }
    }

    /// Invoke another agent from within a handler (spec §4.1 `callAgent`).
    /// When `opts.stream_to_ui` is set, the sub-agent's stream is merged
    /// into `self.response` as it's produced; otherwise it stays isolated
    /// and only the materialized [`CallResult`] is returned.
    pub async fn call_agent(
        &self,
        path: impl Into<Path>,
        params: Bag,
        opts: CallOptions,
    ) -> CallResult {
        self.router.call_agent(path, params, opts, Some(&self.response)).await
    }
}
