#![deny(missing_docs)]
//! `InMemoryAdapter`: a reference [`DurableAdapter`] backed by an embedded,
//! process-local event log.
//!
//! Grounded on `neuron-orch-local::LocalOrch` (in-process dispatch, no
//! external durability) and `neuron-state-memory::MemoryStore` (a
//! `HashMap` behind a `tokio::sync::RwLock`). Suitable for development,
//! testing, and self-hosted single-process deployments — exactly the role
//! spec.md §4.4 describes for "a locally-hosted adapter using an embedded
//! event log". It does not survive a process restart; a managed-service
//! adapter that does is left to downstream deployments (spec §4.4).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use trailhead_core::ErrorPayload;
use trailhead_orch::adapter::{AdapterError, CheckpointKey, DurableAdapter, PendingHook, RunSnapshot, RunStatus};
use uuid::Uuid;

#[derive(Default)]
struct RunState {
    status: RunStatus,
    result: Option<serde_json::Value>,
    error: Option<ErrorPayload>,
    hook: Option<PendingHook>,
    checkpoints: HashMap<String, serde_json::Value>,
}

type HookWaiter = oneshot::Sender<serde_json::Value>;

/// An in-memory, single-process [`DurableAdapter`]. Cheaply cloneable —
/// every clone shares the same event log via `Arc`.
#[derive(Clone, Default)]
pub struct InMemoryAdapter {
    runs: Arc<RwLock<HashMap<String, RunState>>>,
    hooks: Arc<RwLock<HashMap<(String, String), HookWaiter>>>,
}

impl InMemoryAdapter {
    /// An empty adapter with no recorded runs.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableAdapter for InMemoryAdapter {
    async fn start_run(&self, _workflow_id: &str, _input: serde_json::Value) -> Result<String, AdapterError> {
        let run_id = Uuid::new_v4().to_string();
        let mut runs = self.runs.write().await;
        runs.insert(
            run_id.clone(),
            RunState { status: RunStatus::Running, ..Default::default() },
        );
        Ok(run_id)
    }

    async fn checkpoint(&self, run_id: &str, key: &CheckpointKey) -> Result<Option<serde_json::Value>, AdapterError> {
        let runs = self.runs.read().await;
        let run = runs.get(run_id).ok_or_else(|| AdapterError::UnknownRun(run_id.to_string()))?;
        Ok(run.checkpoints.get(key).cloned())
    }

    async fn commit(&self, run_id: &str, key: &CheckpointKey, value: serde_json::Value) -> Result<(), AdapterError> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(run_id).ok_or_else(|| AdapterError::UnknownRun(run_id.to_string()))?;
        run.checkpoints.entry(key.to_string()).or_insert(value);
        Ok(())
    }

    async fn sleep(&self, run_id: &str, key: &CheckpointKey, duration: Duration) -> Result<(), AdapterError> {
        {
            let runs = self.runs.read().await;
            runs.get(run_id).ok_or_else(|| AdapterError::UnknownRun(run_id.to_string()))?;
        }
        tracing::debug!(run_id, key, ?duration, "durable sleep");
        tokio::time::sleep(duration).await;
        Ok(())
    }

    async fn await_hook(
        &self,
        run_id: &str,
        key: &CheckpointKey,
        token: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, AdapterError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut hooks = self.hooks.write().await;
            hooks.insert((run_id.to_string(), token.to_string()), tx);
        }
        let result = tokio::time::timeout(timeout, rx).await;
        let mut hooks = self.hooks.write().await;
        hooks.remove(&(run_id.to_string(), token.to_string()));
        drop(hooks);
        match result {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(AdapterError::InvalidHook(format!("hook sender dropped for {key}"))),
            Err(_) => Err(AdapterError::HookTimeout(token.to_string())),
        }
    }

    async fn resume_hook(&self, run_id: &str, token: &str, payload: serde_json::Value) -> Result<(), AdapterError> {
        let sender = {
            let mut hooks = self.hooks.write().await;
            hooks.remove(&(run_id.to_string(), token.to_string()))
        };
        match sender {
            Some(tx) => tx
                .send(payload)
                .map_err(|_| AdapterError::InvalidHook(format!("hook {token} no longer awaited"))),
            None => Err(AdapterError::InvalidHook(token.to_string())),
        }
    }

    async fn finish_run(&self, run_id: &str, result: Result<serde_json::Value, ErrorPayload>) -> Result<(), AdapterError> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(run_id).ok_or_else(|| AdapterError::UnknownRun(run_id.to_string()))?;
        match result {
            Ok(value) => {
                run.status = RunStatus::Completed;
                run.result = Some(value);
            }
            Err(err) => {
                run.status = RunStatus::Failed;
                run.error = Some(err);
            }
        }
        run.hook = None;
        Ok(())
    }

    async fn mark_paused(&self, run_id: &str, hook: Option<PendingHook>) -> Result<(), AdapterError> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(run_id).ok_or_else(|| AdapterError::UnknownRun(run_id.to_string()))?;
        run.status = if hook.is_some() { RunStatus::Paused } else { RunStatus::Running };
        run.hook = hook;
        Ok(())
    }

    async fn status(&self, run_id: &str) -> Result<RunSnapshot, AdapterError> {
        let runs = self.runs.read().await;
        let run = runs.get(run_id).ok_or_else(|| AdapterError::UnknownRun(run_id.to_string()))?;
        Ok(RunSnapshot {
            status: run.status,
            result: run.result.clone(),
            error: run.error.clone(),
            hook: run.hook.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailhead_orch::adapter::DurableAdapter as _;

    #[tokio::test]
    async fn checkpoint_replay_returns_recorded_value() {
        let adapter = InMemoryAdapter::new();
        let run_id = adapter.start_run("wf", serde_json::Value::Null).await.unwrap();
        assert!(adapter.checkpoint(&run_id, "0").await.unwrap().is_none());
        adapter.commit(&run_id, "0", serde_json::json!("first")).await.unwrap();
        // Replay: a second commit with a different value must not overwrite.
        adapter.commit(&run_id, "0", serde_json::json!("second")).await.unwrap();
        assert_eq!(adapter.checkpoint(&run_id, "0").await.unwrap(), Some(serde_json::json!("first")));
    }

    #[tokio::test]
    async fn hook_resume_delivers_payload() {
        let adapter = InMemoryAdapter::new();
        let run_id = adapter.start_run("wf", serde_json::Value::Null).await.unwrap();
        let adapter2 = adapter.clone();
        let run_id2 = run_id.clone();
        let waiter = tokio::spawn(async move { adapter2.await_hook(&run_id2, "1", "tok-1", Duration::from_secs(5)).await });
        tokio::task::yield_now().await;
        adapter.resume_hook(&run_id, "tok-1", serde_json::json!({"ok": true})).await.unwrap();
        let payload = waiter.await.unwrap().unwrap();
        assert_eq!(payload, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn resume_unknown_token_fails() {
        let adapter = InMemoryAdapter::new();
        let run_id = adapter.start_run("wf", serde_json::Value::Null).await.unwrap();
        let err = adapter.resume_hook(&run_id, "nope", serde_json::Value::Null).await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidHook(_)));
    }

    #[tokio::test]
    async fn hook_times_out_when_not_resumed() {
        let adapter = InMemoryAdapter::new();
        let run_id = adapter.start_run("wf", serde_json::Value::Null).await.unwrap();
        let err = adapter.await_hook(&run_id, "1", "tok-x", Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, AdapterError::HookTimeout(_)));
    }
}
