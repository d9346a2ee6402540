#![deny(missing_docs)]
//! Illustrative HTTP front-end (spec §6 External Interfaces): axum routes
//! binding `/chat`, `/agent/<path>`, `/workflows/*`, and `/workers/*` onto
//! a [`trailhead_router::Router`], [`trailhead_orch::engine::Engine`], and
//! [`trailhead_worker::WorkerRuntime`].
//!
//! Grounded on `hi-youichi-loom/serve`'s `run_serve`/`run_serve_on_listener`
//! pair and `tracing_subscriber` init, adapted from a websocket transport
//! to axum's SSE response for `/chat` (spec §9: "SSE/chunked body for
//! `/chat`, JSON for the rest"). This crate is explicitly a collaborator,
//! not part of the core's test surface beyond a thin integration smoke
//! test (spec.md §1, §6).

mod agent;
mod app;
mod chat;
mod config;
mod state;
mod workers;
mod workflows;

use tokio::net::TcpListener;
use tracing::info;

pub use app::router;
pub use config::TrailheadConfig;
pub use state::AppState;

pub use agent::AgentRequestBody;
pub use chat::ChatRequestBody;
pub use workers::{CallbackBody, DispatchRequest, DispatchResponse};
pub use workflows::{OrchestrateRequest, RunStartedResponse, RunStatusResponse, SignalRequest, StatusQuery};

const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8787";

/// Serve `state` on an already-bound listener. Used directly by tests
/// (bind to `127.0.0.1:0`, then read back the assigned port).
pub async fn run_serve_on_listener(listener: TcpListener, state: AppState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!("Trailhead HTTP front-end listening on http://{addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Bind `addr` (default `127.0.0.1:8787`) and serve `state`.
pub async fn run_serve(addr: Option<&str>, state: AppState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = addr.unwrap_or(DEFAULT_HTTP_ADDR);
    let listener = TcpListener::bind(addr).await?;
    run_serve_on_listener(listener, state).await
}

/// Install a `tracing_subscriber` `EnvFilter` subscriber reading
/// `RUST_LOG`, falling back to `info` (spec §7 structured logging via
/// `tracing`; mirrors `hi-youichi-loom/serve`'s `tracing_subscriber` use at
/// process start).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
}
