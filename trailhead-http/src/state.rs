//! Shared application state (spec §9 "explicit `Application` aggregate
//! instead of singletons"). Grounded on `hi-youichi-loom/serve`'s
//! `AppState` — a small `Clone` struct of `Arc`-wrapped collaborators
//! handed to every handler through axum's `State` extractor.

use std::sync::Arc;

use trailhead_orch::{Engine, MapWorkflowRegistry};
use trailhead_router::Router;
use trailhead_worker::WorkerRuntime;

use crate::config::TrailheadConfig;

/// Everything an HTTP handler needs: the agent router, the orchestration
/// engine, the workflow registry it runs against, the worker runtime, and
/// process configuration.
#[derive(Clone)]
pub struct AppState {
    /// The agent/tool router, shared with `/chat` and `/agent/<path>`.
    pub router: Router,
    /// The orchestration engine driving `/workflows/*`.
    pub engine: Arc<Engine>,
    /// Resolves a `workflowId` to its step-graph config.
    pub workflows: Arc<MapWorkflowRegistry>,
    /// The typed worker runtime backing `/workers/*`.
    pub workers: WorkerRuntime,
    /// Process-start configuration.
    pub config: TrailheadConfig,
}

impl AppState {
    /// Assemble application state from its collaborators.
    pub fn new(router: Router, engine: Arc<Engine>, workflows: Arc<MapWorkflowRegistry>, workers: WorkerRuntime, config: TrailheadConfig) -> Self {
        Self { router, engine, workflows, workers, config }
    }
}
