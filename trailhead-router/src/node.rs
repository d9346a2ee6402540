//! The route trie (spec §3 Route Node, §4.1 component A).

use crate::agent::Agent;
use crate::middleware::Middleware;
use std::collections::HashMap;
use std::sync::Arc;
use trailhead_core::{Path, ToolDescriptor};

/// One node of the route trie. Invariant: at most one agent handler per
/// node (spec §3). Created during registration; read-only once the
/// [`crate::Router`] built from it serves its first request.
pub(crate) struct RouteNode {
    pub(crate) path: Path,
    pub(crate) children: HashMap<String, RouteNode>,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) handler: Option<Arc<dyn Agent>>,
    pub(crate) tool: Option<ToolDescriptor>,
}

impl RouteNode {
    pub(crate) fn new(path: Path) -> Self {
        Self {
            path,
            children: HashMap::new(),
            middlewares: Vec::new(),
            handler: None,
            tool: None,
        }
    }

    /// Collect every tool descriptor in this subtree, absolute-path order
    /// unspecified (callers sort/validate as needed).
    pub(crate) fn collect_tools(&self, out: &mut Vec<ToolDescriptor>) {
        if let Some(tool) = &self.tool {
            out.push(tool.clone());
        }
        for child in self.children.values() {
            child.collect_tools(out);
        }
    }
}

/// Merge `src` (the root of a mounted sub-router) into `dst`, which already
/// sits at the correct absolute mount path. Recomputes tool descriptors'
/// `absolute_path`/`tool_key` to the mounted location (spec §4.1 `agent(path,
/// subRouter)`: "All subRouter routes are visible as `<path><subPath>`").
pub(crate) fn merge_node(dst: &mut RouteNode, src: RouteNode) -> Result<(), trailhead_core::TrailheadError> {
    use trailhead_core::TrailheadError;

    if let Some(handler) = src.handler {
        if dst.handler.is_some() {
            return Err(TrailheadError::DuplicateRoute(dst.path.to_string()));
        }
        dst.handler = Some(handler);
    }

    if let Some(mut tool) = src.tool {
        if dst.tool.is_some() {
            return Err(TrailheadError::DuplicateToolId(dst.path.to_string()));
        }
        tool.absolute_path = dst.path.clone();
        tool.tool_key = dst.path.tool_key();
        dst.tool = Some(tool);
    }

    dst.middlewares.extend(src.middlewares);

    for (segment, child) in src.children {
        let child_path = dst.path.join(&segment);
        let dst_child = dst
            .children
            .entry(segment)
            .or_insert_with(|| RouteNode::new(child_path));
        merge_node(dst_child, child)?;
    }

    Ok(())
}
