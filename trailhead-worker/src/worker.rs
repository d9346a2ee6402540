//! The typed Worker Runtime (spec §4.5, component G): registration,
//! dispatch (local in-process execution or remote enqueue), progress
//! tracking through the [`JobStore`], and webhook delivery on completion.
//!
//! Grounded on `agent-runtime::session`'s storage-handle pattern for the
//! store side, and on `neuron-env-local::LocalEnv` for the "run the thing
//! in this process, report back through a shared handle" shape of local
//! dispatch.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use trailhead_core::{JobRecord, JobStatus, JobUpdate};

use crate::store::{JobStore, JobStoreError};

/// Failures raised by the worker runtime.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum WorkerError {
    /// No worker is registered under the requested id.
    #[error("unknown worker: {0}")]
    UnknownWorker(String),

    /// Input failed the worker's declared input schema.
    #[error("{0}")]
    Schema(#[from] trailhead_core::TrailheadError),

    /// The job store failed.
    #[error("job store error: {0}")]
    Store(#[from] JobStoreError),

    /// A worker handler returned an error.
    #[error("worker {worker_id} failed: {message}")]
    HandlerFailed {
        /// The worker that failed.
        worker_id: String,
        /// The failure message.
        message: String,
    },

    /// Posting the callback webhook failed.
    #[error("webhook delivery failed: {0}")]
    Webhook(String),

    /// A remote dispatch (enqueueing onto `WORKER_BASE_URL`) failed.
    #[error("remote dispatch failed: {0}")]
    RemoteDispatch(String),
}

/// Static configuration for a registered worker (spec §4.5 `WorkerConfig`).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum wall-clock time the handler is allowed to run.
    pub timeout: Duration,
    /// Advisory memory budget in megabytes, surfaced to remote dispatch
    /// backends that size their execution environment from it.
    pub memory_mb: u32,
    /// Optional cron-style schedule for unattended recurring dispatch.
    pub schedule: Option<String>,
    /// JSON Schema the input must satisfy before the handler runs.
    pub input_schema: Option<serde_json::Value>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(300), memory_mb: 256, schedule: None, input_schema: None }
    }
}

/// The handle a running worker uses to report progress and dispatch other
/// workers (spec §4.5 `WorkerContext`).
#[derive(Clone)]
pub struct WorkerContext {
    job_id: String,
    store: Arc<dyn JobStore>,
    runtime: Arc<RuntimeInner>,
}

impl WorkerContext {
    /// Merge `update` into this job's record.
    pub async fn update(&self, update: JobUpdate) -> Result<JobRecord, WorkerError> {
        Ok(self.store.update(&self.job_id, update).await?)
    }

    /// Append one line to this job's log.
    pub async fn log(&self, message: impl Into<String>) -> Result<(), WorkerError> {
        self.update(JobUpdate { append_log: Some(message.into()), ..Default::default() }).await?;
        Ok(())
    }

    /// Report progress, 0-100.
    pub async fn progress(&self, pct: u8, message: impl Into<String>) -> Result<(), WorkerError> {
        self.update(JobUpdate { progress_pct: Some(pct), progress_message: Some(message.into()), ..Default::default() }).await?;
        Ok(())
    }

    /// Dispatch another registered worker from within this one (spec §4.5:
    /// workers may fan out to other workers).
    pub async fn dispatch_worker(&self, worker_id: &str, input: serde_json::Value, opts: DispatchOptions) -> Result<JobRecord, WorkerError> {
        self.runtime.dispatch(worker_id, input, opts).await
    }

    /// This job's id.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

/// A typed unit of background work (spec §4.5 Worker).
#[async_trait]
pub trait Worker: Send + Sync {
    /// The stable id this worker is registered and dispatched under.
    fn id(&self) -> &str;

    /// Static execution configuration.
    fn config(&self) -> &WorkerConfig;

    /// Run the worker to completion, returning its output or an error
    /// message. `ctx` is the only way to report progress or fan out.
    async fn handle(&self, input: serde_json::Value, ctx: WorkerContext) -> Result<serde_json::Value, String>;
}

/// How a job should be dispatched (spec §4.5 `dispatch`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Execute the handler in this process.
    Local,
    /// Enqueue onto the configured remote trigger (`WORKER_BASE_URL`).
    Remote,
}

/// Per-dispatch options (spec §4.5 `dispatch(input, { mode, webhookUrl?,
/// jobId?, metadata? })`).
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Where to execute. Defaults to local when omitted by callers that
    /// construct this directly; [`WorkerRuntime::dispatch`] requires it be
    /// set explicitly.
    pub mode: Option<DispatchMode>,
    /// Posted with the final [`JobRecord`] once the job reaches a terminal
    /// status.
    pub webhook_url: Option<String>,
    /// Reuse this id instead of minting a fresh one. Dispatching twice with
    /// the same `job_id` returns the existing record unchanged
    /// (idempotency, spec §4.5).
    pub job_id: Option<String>,
    /// Opaque metadata stored on the job record.
    pub metadata: serde_json::Value,
}

struct RuntimeInner {
    workers: HashMap<String, Arc<dyn Worker>>,
    store: Arc<dyn JobStore>,
    http: reqwest::Client,
    remote_base_url: Option<String>,
    remote_api_key: Option<String>,
    webhook_secret: Option<String>,
}

impl RuntimeInner {
    async fn post_webhook(&self, url: &str, record: &JobRecord) -> Result<(), WorkerError> {
        let mut builder = self.http.post(url).json(record);
        if let Some(secret) = &self.webhook_secret {
            builder = builder.header("x-webhook-signature", crate::hmac::sign(secret, record));
        }
        builder.send().await.map_err(|e| WorkerError::Webhook(e.to_string()))?.error_for_status().map_err(|e| WorkerError::Webhook(e.to_string()))?;
        Ok(())
    }

    async fn run_local(self: Arc<Self>, worker: Arc<dyn Worker>, job_id: String, input: serde_json::Value, webhook_url: Option<String>) {
        let _ = self
            .store
            .update(&job_id, JobUpdate { status: Some(JobStatus::Running), ..Default::default() })
            .await;
        let ctx = WorkerContext { job_id: job_id.clone(), store: Arc::clone(&self.store), runtime: Arc::clone(&self) };
        let result = tokio::time::timeout(worker.config().timeout, worker.handle(input, ctx)).await;
        let update = match result {
            Ok(Ok(output)) => JobUpdate { status: Some(JobStatus::Completed), output: Some(output), ..Default::default() },
            Ok(Err(message)) => JobUpdate {
                status: Some(JobStatus::Failed),
                error: Some(trailhead_core::ErrorPayload { message, name: Some("WorkerFailure".into()), stack: None }),
                ..Default::default()
            },
            Err(_) => JobUpdate {
                status: Some(JobStatus::Failed),
                error: Some(trailhead_core::ErrorPayload {
                    message: format!("worker {} exceeded its {:?} timeout", worker.id(), worker.config().timeout),
                    name: Some("WorkerFailure".into()),
                    stack: None,
                }),
                ..Default::default()
            },
        };
        let record = self.store.update(&job_id, update).await;
        if let (Some(url), Ok(record)) = (webhook_url, record) {
            if let Err(e) = self.post_webhook(&url, &record).await {
                tracing::warn!(job_id, error = %e, "webhook delivery failed");
            }
        }
    }

    async fn enqueue_remote(&self, worker_id: &str, job_id: &str, input: &serde_json::Value) -> Result<(), WorkerError> {
        let base = self.remote_base_url.as_deref().ok_or_else(|| {
            WorkerError::RemoteDispatch(format!("no WORKER_BASE_URL configured; cannot dispatch {worker_id} remotely"))
        })?;
        let mut request = self.http.post(format!("{base}/workers/{worker_id}")).json(&serde_json::json!({ "jobId": job_id, "input": input }));
        if let Some(key) = &self.remote_api_key {
            request = request.bearer_auth(key);
        }
        request.send().await.map_err(|e| WorkerError::RemoteDispatch(e.to_string()))?.error_for_status().map_err(|e| WorkerError::RemoteDispatch(e.to_string()))?;
        Ok(())
    }

    async fn dispatch(self: &Arc<Self>, worker_id: &str, input: serde_json::Value, opts: DispatchOptions) -> Result<JobRecord, WorkerError> {
        if let Some(job_id) = &opts.job_id {
            if let Some(existing) = self.store.get(job_id).await? {
                return Ok(existing);
            }
        }
        let worker = self.workers.get(worker_id).cloned().ok_or_else(|| WorkerError::UnknownWorker(worker_id.to_string()))?;
        if let Some(schema) = &worker.config().input_schema {
            trailhead_tool::validate(worker_id, schema, &input)?;
        }
        let job_id = opts.job_id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut record = JobRecord::new(job_id.clone(), worker_id, input.clone());
        record.metadata = opts.metadata.clone();
        self.store.put(record.clone()).await?;

        match opts.mode.unwrap_or(DispatchMode::Local) {
            DispatchMode::Local => {
                let this = Arc::clone(self);
                tokio::spawn(this.run_local(worker, job_id.clone(), input, opts.webhook_url.clone()));
            }
            DispatchMode::Remote => {
                self.enqueue_remote(worker_id, &job_id, &input).await?;
            }
        }
        Ok(record)
    }
}

/// The worker registry and dispatch surface (spec §4.5 Worker Runtime).
/// Cheaply cloneable — every clone shares the same registry, job store, and
/// HTTP client.
#[derive(Clone)]
pub struct WorkerRuntime {
    inner: Arc<RuntimeInner>,
}

impl WorkerRuntime {
    /// Build a runtime over `store`, with no workers registered yet.
    /// `remote_base_url`/`remote_api_key` configure remote-mode dispatch
    /// (spec §9 `WORKER_BASE_URL` / `WORKERS_TRIGGER_API_KEY`); `webhook_secret`
    /// is the separate HMAC key (`WEBHOOK_SECRET`) outgoing callback webhooks
    /// are signed with, matching what `/workers/callback` verifies against.
    pub fn new(store: Arc<dyn JobStore>, remote_base_url: Option<String>, remote_api_key: Option<String>) -> Self {
        Self::with_webhook_secret(store, remote_base_url, remote_api_key, None)
    }

    /// As [`Self::new`], also configuring the HMAC key outgoing webhooks are
    /// signed with.
    pub fn with_webhook_secret(
        store: Arc<dyn JobStore>,
        remote_base_url: Option<String>,
        remote_api_key: Option<String>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                workers: HashMap::new(),
                store,
                http: reqwest::Client::new(),
                remote_base_url,
                remote_api_key,
                webhook_secret,
            }),
        }
    }

    /// Register a worker. Registration is static at construction time:
    /// build the map up front via repeated calls before handing the
    /// runtime out, since `inner` is shared via `Arc` once built.
    pub fn with_worker(mut self, worker: Arc<dyn Worker>) -> Self {
        let inner = Arc::get_mut(&mut self.inner).expect("register workers before cloning the runtime");
        inner.workers.insert(worker.id().to_string(), worker);
        self
    }

    /// Dispatch `worker_id` (spec §4.5 `dispatch`). Local-mode dispatch
    /// runs the handler in a background task and returns the `queued`
    /// record immediately; callers that need the result should poll
    /// `job_store().get(job_id)` or use the orchestration engine's
    /// `await=true` worker step, which polls on their behalf.
    pub async fn dispatch(&self, worker_id: &str, input: serde_json::Value, opts: DispatchOptions) -> Result<JobRecord, WorkerError> {
        self.inner.dispatch(worker_id, input, opts).await
    }

    /// The job store backing this runtime.
    pub fn job_store(&self) -> Arc<dyn JobStore> {
        Arc::clone(&self.inner.store)
    }

    /// Look up a worker's static config, if registered.
    pub fn worker_config(&self, worker_id: &str) -> Option<WorkerConfig> {
        self.inner.workers.get(worker_id).map(|w| w.config().clone())
    }
}

/// Adapts a [`WorkerRuntime`] to `trailhead_orch::engine::WorkerDispatcher`,
/// so the orchestration engine can dispatch workers without depending on
/// this crate's job-store internals.
#[async_trait]
impl trailhead_orch::engine::WorkerDispatcher for WorkerRuntime {
    async fn dispatch(&self, worker_id: &str, input: serde_json::Value) -> Result<String, trailhead_core::TrailheadError> {
        let record = self
            .dispatch(worker_id, input, DispatchOptions { mode: Some(DispatchMode::Local), ..Default::default() })
            .await
            .map_err(|e| trailhead_core::TrailheadError::WorkerFailure(e.to_string()))?;
        Ok(record.job_id)
    }

    async fn await_terminal(&self, job_id: &str) -> Result<serde_json::Value, trailhead_core::TrailheadError> {
        let store = self.job_store();
        loop {
            let record = store
                .get(job_id)
                .await
                .map_err(|e| trailhead_core::TrailheadError::WorkerFailure(e.to_string()))?
                .ok_or_else(|| trailhead_core::TrailheadError::NotFound(format!("job {job_id}")))?;
            match record.status {
                JobStatus::Completed => return Ok(record.output.unwrap_or(serde_json::Value::Null)),
                JobStatus::Failed => {
                    let message = record.error.map(|e| e.message).unwrap_or_else(|| "worker failed".into());
                    return Err(trailhead_core::TrailheadError::WorkerFailure(message));
                }
                JobStatus::Queued | JobStatus::Running => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryJobStore;

    struct Echo;
    #[async_trait]
    impl Worker for Echo {
        fn id(&self) -> &str {
            "echo"
        }
        fn config(&self) -> &WorkerConfig {
            static CONFIG: std::sync::OnceLock<WorkerConfig> = std::sync::OnceLock::new();
            CONFIG.get_or_init(WorkerConfig::default)
        }
        async fn handle(&self, input: serde_json::Value, ctx: WorkerContext) -> Result<serde_json::Value, String> {
            ctx.progress(50, "halfway").await.map_err(|e| e.to_string())?;
            Ok(input)
        }
    }

    struct AlwaysFails;
    #[async_trait]
    impl Worker for AlwaysFails {
        fn id(&self) -> &str {
            "boom"
        }
        fn config(&self) -> &WorkerConfig {
            static CONFIG: std::sync::OnceLock<WorkerConfig> = std::sync::OnceLock::new();
            CONFIG.get_or_init(WorkerConfig::default)
        }
        async fn handle(&self, _input: serde_json::Value, _ctx: WorkerContext) -> Result<serde_json::Value, String> {
            Err("deliberate failure".into())
        }
    }

    fn runtime() -> WorkerRuntime {
        WorkerRuntime::new(Arc::new(MemoryJobStore::new()), None, None).with_worker(Arc::new(Echo)).with_worker(Arc::new(AlwaysFails))
    }

    #[tokio::test]
    async fn local_dispatch_runs_and_completes() {
        let rt = runtime();
        let record = rt.dispatch("echo", serde_json::json!({"x": 1}), DispatchOptions::default()).await.unwrap();
        let job_id = record.job_id;
        for _ in 0..20 {
            let r = rt.job_store().get(&job_id).await.unwrap().unwrap();
            if r.status == JobStatus::Completed {
                assert_eq!(r.output, Some(serde_json::json!({"x": 1})));
                assert_eq!(r.progress_pct, 50);
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job did not complete in time");
    }

    #[tokio::test]
    async fn dispatch_with_same_job_id_is_idempotent() {
        let rt = runtime();
        let opts = DispatchOptions { job_id: Some("fixed".into()), ..Default::default() };
        let first = rt.dispatch("echo", serde_json::json!(1), opts.clone()).await.unwrap();
        let second = rt.dispatch("echo", serde_json::json!(999), opts).await.unwrap();
        assert_eq!(first.job_id, second.job_id);
        assert_eq!(second.input, serde_json::json!(1));
    }

    #[tokio::test]
    async fn unknown_worker_is_rejected() {
        let rt = runtime();
        let err = rt.dispatch("nope", serde_json::Value::Null, DispatchOptions::default()).await.unwrap_err();
        assert!(matches!(err, WorkerError::UnknownWorker(_)));
    }

    /// Outgoing webhook callbacks must sign with `webhook_secret`
    /// (`WEBHOOK_SECRET`), not `remote_api_key` (`WORKERS_TRIGGER_API_KEY`)
    /// — `callback_handler` verifies against the former, and the two are
    /// configured from distinct env vars (spec §6, §9).
    #[tokio::test]
    async fn webhook_is_signed_with_the_webhook_secret_not_the_remote_api_key() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            socket.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n").await.unwrap();
            request
                .lines()
                .find_map(|line| line.to_ascii_lowercase().starts_with("x-webhook-signature:").then(|| line.splitn(2, ':').nth(1).unwrap().trim().to_string()))
        });

        let inner = RuntimeInner {
            workers: HashMap::new(),
            store: Arc::new(MemoryJobStore::new()),
            http: reqwest::Client::new(),
            remote_base_url: None,
            remote_api_key: Some("trigger-key".into()),
            webhook_secret: Some("webhook-secret".into()),
        };
        let record = JobRecord::new("job-1", "echo", serde_json::json!({"x": 1}));
        inner.post_webhook(&format!("http://{addr}"), &record).await.unwrap();

        let signature = captured.await.unwrap().expect("signature header present");
        assert_eq!(signature, crate::hmac::sign("webhook-secret", &record));
        assert_ne!(signature, crate::hmac::sign("trigger-key", &record));
    }

    #[tokio::test]
    async fn failing_worker_marks_job_failed() {
        let rt = runtime();
        let record = rt.dispatch("boom", serde_json::Value::Null, DispatchOptions::default()).await.unwrap();
        for _ in 0..20 {
            let r = rt.job_store().get(&record.job_id).await.unwrap().unwrap();
            if r.status == JobStatus::Failed {
                assert_eq!(r.error.unwrap().message, "deliberate failure");
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job did not fail in time");
    }
}
