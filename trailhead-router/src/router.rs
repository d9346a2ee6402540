//! [`RouterBuilder`] and [`Router`] (spec §4.1 Router Core, component E).

use crate::agent::Agent;
use crate::context::Context;
use crate::middleware::{Middleware, Next};
use crate::node::{merge_node, RouteNode};
use std::collections::HashSet;
use std::sync::Arc;
use trailhead_core::{Bag, ErrorPayload, Path, Request, ToolDescriptor, TrailheadError};
use trailhead_stream::materialize::accumulate;
use trailhead_stream::{AwaitResponse, ResponseStream, ResponseWriter};
use uuid::Uuid;

/// The name under which an agent's returned value (if any) is surfaced as a
/// `Part::Data` part, so both streaming and materialized callers observe it
/// uniformly (spec §3: "A handler ... may return a value or write to the
/// Stream").
pub const RETURN_DATA_NAME: &str = "$return";

/// Options controlling [`Router::call_agent`] / [`Context::call_agent`]
/// (spec §4.1 `callAgent`).
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOptions {
    /// When true, the sub-agent's stream is merged live into the caller's
    /// response stream. When false, it stays isolated.
    pub stream_to_ui: bool,
}

impl CallOptions {
    /// `{ streamToUI: true }`.
    pub fn stream_to_ui() -> Self {
        Self { stream_to_ui: true }
    }

    /// `{ streamToUI: false }` (the default).
    pub fn isolated() -> Self {
        Self { stream_to_ui: false }
    }
}

/// The outcome of an isolated `callAgent` (spec §4.1: "returns `{ ok, data |
/// error }`").
#[derive(Debug, Clone)]
pub struct CallResult {
    /// True if the sub-agent's stream ended in `finish` rather than `error`.
    pub ok: bool,
    /// The sub-agent's returned value, if any.
    pub data: Option<serde_json::Value>,
    /// The terminal error, if the stream ended in one.
    pub error: Option<ErrorPayload>,
}

/// A snapshot of every tool descriptor reachable in the trie, keyed by
/// `tool_key` (spec §4.1 `registry()`, §3 Tool Descriptor invariant: unique
/// `id` and `tool_key`).
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    /// Every descriptor, in an unspecified but stable order.
    pub tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Descriptors whose `absolute_path` is `sub_path` or a descendant of it
    /// (spec §4.3 `agentAsTool`).
    pub fn under(&self, sub_path: &Path) -> Vec<&ToolDescriptor> {
        self.tools
            .iter()
            .filter(|t| sub_path.is_prefix_of(&t.absolute_path))
            .collect()
    }
}

fn validate_registry(tools: Vec<ToolDescriptor>) -> Result<ToolRegistry, TrailheadError> {
    let mut ids = HashSet::new();
    let mut keys = HashSet::new();
    for tool in &tools {
        if !ids.insert(tool.id.clone()) {
            return Err(TrailheadError::DuplicateToolId(tool.id.clone()));
        }
        if !keys.insert(tool.tool_key.clone()) {
            return Err(TrailheadError::DuplicateToolId(tool.tool_key.clone()));
        }
    }
    Ok(ToolRegistry { tools })
}

/// Builds a route trie through `agent`/`use_mw`/`mount`/`act_as_tool`, then
/// freezes it into an immutable, cheaply-cloneable [`Router`] (spec §9:
/// "explicit Application aggregate instead of singletons"; spec §5: "the
/// registry is effectively immutable after startup").
pub struct RouterBuilder {
    root: RouteNode,
}

impl RouterBuilder {
    /// An empty builder rooted at `/`.
    pub fn new() -> Self {
        Self {
            root: RouteNode::new(Path::root()),
        }
    }

    fn ensure_node_mut(&mut self, path: &Path) -> &mut RouteNode {
        let mut node = &mut self.root;
        let mut acc = Path::root();
        for segment in path.segments() {
            acc = acc.join(segment);
            let acc_clone = acc.clone();
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(|| RouteNode::new(acc_clone));
        }
        node
    }

    /// Register a terminal handler at `path` (spec §4.1 `agent(path,
    /// handler)`). Re-registering the identical `Arc` is idempotent;
    /// registering a different handler at an occupied path fails with
    /// [`TrailheadError::DuplicateRoute`].
    pub fn agent(mut self, path: impl Into<Path>, handler: Arc<dyn Agent>) -> Result<Self, TrailheadError> {
        let path = path.into();
        let node = self.ensure_node_mut(&path);
        match &node.handler {
            Some(existing) if Arc::ptr_eq(existing, &handler) => {}
            Some(_) => return Err(TrailheadError::DuplicateRoute(path.to_string())),
            None => node.handler = Some(handler),
        }
        Ok(self)
    }

    /// Register a middleware scoped to the subtree rooted at `path` (spec
    /// §4.1 `use(path, middleware)`). Middlewares run in registration order,
    /// outermost (root) first.
    pub fn use_mw(mut self, path: impl Into<Path>, middleware: Arc<dyn Middleware>) -> Self {
        let path = path.into();
        self.ensure_node_mut(&path).middlewares.push(middleware);
        self
    }

    /// Mount `sub`'s entire trie at `path` (spec §4.1 `agent(path,
    /// subRouter)`). The sub-router's own middlewares and tool descriptors
    /// are reparented onto the mount point.
    pub fn mount(mut self, path: impl Into<Path>, sub: RouterBuilder) -> Result<Self, TrailheadError> {
        let path = path.into();
        let dst = self.ensure_node_mut(&path);
        merge_node(dst, sub.root)?;
        Ok(self)
    }

    /// Attach a tool descriptor to the node at `path` (spec §4.1
    /// `actAsTool`). `descriptor.absolute_path`/`tool_key` are overwritten
    /// to match `path`.
    pub fn act_as_tool(mut self, path: impl Into<Path>, mut descriptor: ToolDescriptor) -> Result<Self, TrailheadError> {
        let path = path.into();
        descriptor.absolute_path = path.clone();
        descriptor.tool_key = path.tool_key();
        let node = self.ensure_node_mut(&path);
        if node.tool.is_some() {
            return Err(TrailheadError::DuplicateToolId(path.to_string()));
        }
        node.tool = Some(descriptor);
        Ok(self)
    }

    /// Freeze the trie into a [`Router`], validating the tool registry
    /// eagerly so collisions surface at startup rather than lazily (spec §8
    /// invariant 2).
    pub fn build(self) -> Result<Router, TrailheadError> {
        let mut tools = Vec::new();
        self.root.collect_tools(&mut tools);
        let registry = validate_registry(tools)?;
        Ok(Router {
            inner: Arc::new(RouterInner {
                root: self.root,
                registry,
            }),
        })
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct RouterInner {
    root: RouteNode,
    registry: ToolRegistry,
}

/// An immutable, cheaply-cloneable router handle (spec §4.1 Router Core).
/// Every clone shares the same underlying trie via `Arc`.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    fn resolve(&self, path: &Path) -> Result<(Vec<Arc<dyn Middleware>>, Arc<dyn Agent>), TrailheadError> {
        let mut node = &self.inner.root;
        let mut middlewares = node.middlewares.clone();
        for segment in path.segments() {
            node = node
                .children
                .get(segment)
                .ok_or_else(|| TrailheadError::NotFound(path.to_string()))?;
            middlewares.extend(node.middlewares.iter().cloned());
        }
        match &node.handler {
            Some(handler) => Ok((middlewares, Arc::clone(handler))),
            None => Err(TrailheadError::NotFound(path.to_string())),
        }
    }

    /// Execute the chain for `path` and return the stream incrementally
    /// (spec §4.1 `handle`).
    pub fn handle(&self, path: impl Into<Path>, request: Request) -> ResponseStream {
        let path = path.into();
        let router = self.clone();
        let (writer, stream) = trailhead_stream::channel(trailhead_stream::DEFAULT_CAPACITY);
        tokio::spawn(async move {
            run_chain(router, path, request, writer).await;
        });
        stream
    }

    /// Execute and block until the chain finishes, materializing the stream
    /// into a single payload (spec §4.1 `toAwaitResponse`).
    pub async fn to_await_response(&self, path: impl Into<Path>, request: Request) -> AwaitResponse {
        trailhead_stream::materialize::materialize(self.handle(path, request)).await
    }

    /// Invoke another agent (spec §4.1 `callAgent`). `merge_into`, when
    /// present, receives every part the sub-agent emits as it emits them.
    pub async fn call_agent(
        &self,
        path: impl Into<Path>,
        params: Bag,
        opts: CallOptions,
        merge_into: Option<&ResponseWriter>,
    ) -> CallResult {
        let path = path.into();
        let mut request = Request::new(path.clone());
        request.params = params;
        let mut stream = self.handle(path, request);
        let mut acc = AwaitResponse::default();
        while let Some(part) = stream.next_part().await {
            if opts.stream_to_ui {
                if let Some(writer) = merge_into {
                    writer.write(part.clone()).await;
                }
            }
            let terminal = accumulate(&mut acc, &part);
            if terminal {
                break;
            }
        }
        let data = acc.data.iter().rev().find(|(name, _)| name == RETURN_DATA_NAME).map(|(_, v)| v.clone());
        CallResult {
            ok: !acc.is_error(),
            data,
            error: acc.error,
        }
    }

    /// Enumerate every tool reachable in the trie (spec §4.1 `registry()`).
    pub fn registry(&self) -> &ToolRegistry {
        &self.inner.registry
    }
}

async fn run_chain(router: Router, path: Path, request: Request, writer: ResponseWriter) {
    let message_id = Uuid::new_v4();
    writer.start(message_id).await;

    let resolved = router.resolve(&path);
    let mut ctx = Context::new(request, writer.clone(), router);

    let outcome = match resolved {
        Ok((middlewares, handler)) => {
            let next = Next::new(&middlewares, handler.as_ref());
            next.run(&mut ctx).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(Some(value)) => {
            writer.data(message_id, RETURN_DATA_NAME, value).await;
            writer.finish(message_id).await;
        }
        Ok(None) => writer.finish(message_id).await,
        Err(e) => writer.error(message_id, e.to_string(), None).await,
    }
}
