//! The Durable Adapter Port (spec §4.4): the provider-agnostic contract the
//! engine drives. Grounded on `layer0::orchestrator::Orchestrator`
//! (`dispatch`/`dispatch_many`/`signal`/`query`), widened to the four
//! guarantees spec.md §4.4 names: deterministic replay, durable suspension,
//! a resume endpoint, and status query.
//!
//! The core never depends on a specific provider's types — only this
//! trait. Two reference adapters are anticipated (spec §4.4): a
//! locally-hosted adapter over an embedded event log (`trailhead-orch-local`)
//! and a managed-service adapter (left to downstream deployments).

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors a [`DurableAdapter`] implementation may report.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No run exists with the given id.
    #[error("unknown run: {0}")]
    UnknownRun(String),
    /// A hook resume arrived with an unknown or already-resumed token
    /// (spec §4.4 guarantee 3).
    #[error("invalid hook: {0}")]
    InvalidHook(String),
    /// A hook was not resumed within its timeout.
    #[error("hook timed out: {0}")]
    HookTimeout(String),
    /// The adapter's backing store failed.
    #[error("adapter storage failure: {0}")]
    Storage(String),
    /// Catch-all for provider-specific faults.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse lifecycle status of a durable run (spec §4.4 guarantee 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted, not yet started.
    #[default]
    Pending,
    /// Actively executing a step.
    Running,
    /// Parked on a `sleep` or `hook` step.
    Paused,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

/// Information about the hook a paused run is waiting on.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PendingHook {
    /// The resolved token the run is waiting for.
    pub token: String,
    /// When the wait began.
    pub waiting_since: chrono::DateTime<chrono::Utc>,
    /// When the wait times out.
    pub deadline: chrono::DateTime<chrono::Utc>,
}

/// A snapshot of a run's status (spec §4.4 guarantee 4: `{ status, result?,
/// error?, hook? }`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunSnapshot {
    /// Coarse status.
    pub status: RunStatus,
    /// The final result, once `status == Completed`.
    pub result: Option<serde_json::Value>,
    /// The terminal error, once `status == Failed`.
    pub error: Option<trailhead_core::ErrorPayload>,
    /// The hook currently being waited on, if `status == Paused` on a hook.
    pub hook: Option<PendingHook>,
}

/// A checkpoint key identifies one durable operation within one run, so the
/// adapter can recognize replay: the same `(run_id, checkpoint_key)` pair
/// must not re-execute a side effect (spec §4.4 guarantee 1, "deterministic
/// replay").
pub type CheckpointKey = str;

/// The provider-agnostic durable-workflow contract the engine executes
/// steps over (spec §4.4 Durable-workflow contract).
///
/// Implementations own all persistence and suspension; the engine
/// (`crate::engine::Engine`) only ever calls through this trait — it never
/// embeds a specific backend's types (spec §4.4: "The core code MUST NOT
/// depend on any specific provider's types").
#[async_trait]
pub trait DurableAdapter: Send + Sync {
    /// Begin tracking a new run. Returns a fresh `run_id`.
    async fn start_run(&self, workflow_id: &str, input: serde_json::Value) -> Result<String, AdapterError>;

    /// Look up a previously recorded checkpoint for `(run_id, key)`. On
    /// replay, a present value MUST be returned instead of recomputing the
    /// step's side effect (guarantee 1).
    async fn checkpoint(&self, run_id: &str, key: &CheckpointKey) -> Result<Option<serde_json::Value>, AdapterError>;

    /// Record a checkpoint's output. Idempotent: recording the same key
    /// twice with the same value is a no-op.
    async fn commit(&self, run_id: &str, key: &CheckpointKey, value: serde_json::Value) -> Result<(), AdapterError>;

    /// Durably sleep for `duration` under `key`. Implementations MAY hold
    /// no compute while parked (guarantee 2); the reference local adapter
    /// parks a `tokio::time::sleep` task instead of blocking the caller.
    async fn sleep(&self, run_id: &str, key: &CheckpointKey, duration: Duration) -> Result<(), AdapterError>;

    /// Suspend until an external `resume_hook(run_id, token, ..)` call
    /// delivers a payload, or `timeout` elapses. Returns the delivered
    /// payload, or [`AdapterError::HookTimeout`].
    async fn await_hook(
        &self,
        run_id: &str,
        key: &CheckpointKey,
        token: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, AdapterError>;

    /// Deliver a resume payload to a paused hook (spec §4.4 guarantee 3).
    /// Fails with [`AdapterError::InvalidHook`] if `token` is unknown or
    /// already resumed.
    async fn resume_hook(&self, run_id: &str, token: &str, payload: serde_json::Value) -> Result<(), AdapterError>;

    /// Mark a run's terminal outcome.
    async fn finish_run(&self, run_id: &str, result: Result<serde_json::Value, trailhead_core::ErrorPayload>) -> Result<(), AdapterError>;

    /// Record that a run is now paused waiting on `hook`, for [`Self::status`]
    /// to report.
    async fn mark_paused(&self, run_id: &str, hook: Option<PendingHook>) -> Result<(), AdapterError>;

    /// Query a run's current status (spec §4.4 guarantee 4).
    async fn status(&self, run_id: &str) -> Result<RunSnapshot, AdapterError>;
}
