//! Multi-step worker chains (spec §3 Queue Job Record, §4.5 Queue): an
//! ordered sequence of worker dispatches with inter-step delays and
//! optional input mapping, fail-fast with the remainder marked `skipped`.
//!
//! Grounded on the same dispatch-then-poll shape `crate::worker` uses for a
//! single worker, generalized to a `Vec<StepRecord>` driven step by step.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use trailhead_core::queue::{QueueJobRecord, StepStatus};
use trailhead_core::JobStatus;

use crate::worker::{DispatchMode, DispatchOptions, WorkerError, WorkerRuntime};

/// A pure function mapping the queue's original input and every prior
/// step's output into the next step's input (spec §4.4 `mapInputFromPrev`,
/// "a reference to a pure mapping function resolved by the runtime").
pub type MapInputFromPrev = Arc<dyn Fn(&serde_json::Value, &[serde_json::Value]) -> serde_json::Value + Send + Sync>;

/// One step of a [`WorkerQueueConfig`].
#[derive(Clone)]
pub struct QueueStep {
    /// The worker this step dispatches to.
    pub worker_id: String,
    /// Durable delay before this step runs, after the previous one
    /// finishes (spec §4.5: "the runtime waits durably").
    pub delay: Option<Duration>,
    /// When absent, this step's input is the previous step's output
    /// (spec §4.5 default). When present, it's computed from the queue's
    /// original input and every prior output.
    pub map_input_from_prev: Option<MapInputFromPrev>,
}

impl QueueStep {
    /// A step with no delay and the default previous-output passthrough.
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self { worker_id: worker_id.into(), delay: None, map_input_from_prev: None }
    }

    /// Wait `delay` after the previous step before dispatching this one.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Compute this step's input instead of reusing the previous output.
    pub fn with_input_mapping(mut self, f: MapInputFromPrev) -> Self {
        self.map_input_from_prev = Some(f);
        self
    }
}

/// A named chain of [`QueueStep`]s (spec §4.5 `WorkerQueueConfig`).
#[derive(Clone)]
pub struct WorkerQueueConfig {
    /// Stable identifier for this queue.
    pub id: String,
    /// Steps, in execution order.
    pub steps: Vec<QueueStep>,
    /// Optional cron-style schedule for unattended recurring runs.
    pub schedule: Option<String>,
}

impl WorkerQueueConfig {
    /// A queue with no schedule.
    pub fn new(id: impl Into<String>, steps: Vec<QueueStep>) -> Self {
        Self { id: id.into(), steps, schedule: None }
    }
}

/// Failures raised by the queue runner.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum QueueError {
    /// No queue is registered under the requested id.
    #[error("unknown queue: {0}")]
    UnknownQueue(String),
    /// The underlying worker dispatch failed.
    #[error(transparent)]
    Worker(#[from] WorkerError),
    /// The job store failed.
    #[error(transparent)]
    Store(#[from] crate::store::JobStoreError),
}

/// Storage for [`QueueJobRecord`]s, kept separate from the per-worker
/// [`crate::store::JobStore`] since a queue run's identity (`queue_job_id`)
/// is distinct from any one step's `worker_job_id`.
#[derive(Clone, Default)]
pub struct QueueJobStore {
    runs: Arc<RwLock<HashMap<String, QueueJobRecord>>>,
}

impl QueueJobStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a run by id.
    pub async fn get(&self, queue_job_id: &str) -> Option<QueueJobRecord> {
        self.runs.read().await.get(queue_job_id).cloned()
    }

    async fn put(&self, record: QueueJobRecord) {
        self.runs.write().await.insert(record.queue_job_id.clone(), record);
    }
}

/// Executes [`WorkerQueueConfig`]s over a [`WorkerRuntime`] (spec §4.5
/// Queue).
#[derive(Clone)]
pub struct QueueRunner {
    runtime: WorkerRuntime,
    configs: Arc<HashMap<String, WorkerQueueConfig>>,
    store: QueueJobStore,
}

impl QueueRunner {
    /// Build a runner over `runtime` with the given queue configs
    /// registered, each keyed by its own `id`.
    pub fn new(runtime: WorkerRuntime, configs: Vec<WorkerQueueConfig>) -> Self {
        Self {
            runtime,
            configs: Arc::new(configs.into_iter().map(|c| (c.id.clone(), c)).collect()),
            store: QueueJobStore::new(),
        }
    }

    /// The queue job store backing this runner.
    pub fn job_store(&self) -> QueueJobStore {
        self.store.clone()
    }

    /// Start `queue_id` with `input`, running every step to completion (or
    /// the first failure) before returning. Each step's result is visible
    /// in the returned record regardless of outcome.
    pub async fn run(&self, queue_id: &str, input: serde_json::Value) -> Result<QueueJobRecord, QueueError> {
        let config = self.configs.get(queue_id).ok_or_else(|| QueueError::UnknownQueue(queue_id.to_string()))?;
        let worker_ids: Vec<String> = config.steps.iter().map(|s| s.worker_id.clone()).collect();
        let queue_job_id = uuid::Uuid::new_v4().to_string();
        let mut record = QueueJobRecord::new(queue_job_id, queue_id, &worker_ids);
        self.store.put(record.clone()).await;

        let mut outputs: Vec<serde_json::Value> = Vec::new();
        let mut failed = false;

        for (i, step) in config.steps.iter().enumerate() {
            if failed {
                record.steps[i].status = StepStatus::Skipped;
                continue;
            }

            if let Some(delay) = step.delay {
                if i > 0 && delay > Duration::ZERO {
                    tokio::time::sleep(delay).await;
                }
            }

            let step_input = match (&step.map_input_from_prev, outputs.last()) {
                (Some(map), _) => map(&input, &outputs),
                (None, Some(prev)) => prev.clone(),
                (None, None) => input.clone(),
            };
            record.steps[i].input = Some(step_input.clone());
            record.steps[i].status = StepStatus::Running;
            record.steps[i].started_at = Some(chrono::Utc::now());
            record.recompute_status();
            self.store.put(record.clone()).await;

            let dispatched = self.runtime.dispatch(&step.worker_id, step_input, DispatchOptions { mode: Some(DispatchMode::Local), ..Default::default() }).await?;
            record.steps[i].worker_job_id = Some(dispatched.job_id.clone());

            let terminal = self.await_terminal(&dispatched.job_id).await?;
            record.steps[i].finished_at = Some(chrono::Utc::now());
            match terminal.status {
                JobStatus::Completed => {
                    let output = terminal.output.unwrap_or(serde_json::Value::Null);
                    record.steps[i].output = Some(output.clone());
                    record.steps[i].status = StepStatus::Completed;
                    outputs.push(output);
                }
                JobStatus::Failed => {
                    record.steps[i].error = terminal.error;
                    record.steps[i].status = StepStatus::Failed;
                    failed = true;
                }
                JobStatus::Queued | JobStatus::Running => unreachable!("await_terminal only returns terminal jobs"),
            }
            record.recompute_status();
            self.store.put(record.clone()).await;
        }

        Ok(record)
    }

    async fn await_terminal(&self, job_id: &str) -> Result<trailhead_core::JobRecord, QueueError> {
        let store = self.runtime.job_store();
        loop {
            let job = store.get(job_id).await?.expect("job was just dispatched");
            if job.status.is_terminal() {
                return Ok(job);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
