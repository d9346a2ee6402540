#![deny(missing_docs)]
//! The path-addressed router: the trie, the middleware chain, the
//! per-invocation [`Context`], and the [`Router`]/[`RouterBuilder`] pair
//! applications build against (spec §4.1 Router Core, §4.2 Middleware
//! Chain, §3 Context).

mod agent;
mod context;
mod logger;
mod middleware;
mod node;
mod router;

pub use agent::{agent_fn, Agent};
pub use context::Context;
pub use logger::Logger;
pub use middleware::{middleware_fn, BoxFuture, Middleware, Next};
pub use router::{CallOptions, CallResult, Router, RouterBuilder, ToolRegistry, RETURN_DATA_NAME};
