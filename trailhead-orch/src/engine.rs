//! The step interpreter (spec §4.4, component H).
//!
//! Grounded on `neuron-orch-kit::runner::OrchestratedRunner::run` — a loop
//! that dispatches a unit of work, threads its output into the running
//! context, and advances — generalized here from "interpret Effects into
//! follow-up dispatches" to "execute a [`Step`], record its output under
//! `ctx.steps`, move to the next step."

use crate::adapter::{AdapterError, DurableAdapter, PendingHook};
use crate::context::RunningContext;
use crate::step::{OrchestrationConfig, OrchestrationOptions, Step};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use trailhead_core::{Bag, ErrorPayload, Path, TrailheadError};
use trailhead_router::{CallOptions, Router};

/// Dispatches and awaits workers on behalf of the engine (spec §4.5),
/// implemented by `trailhead-worker` and handed to the engine so this
/// crate never depends on the worker runtime's job-store internals.
#[async_trait]
pub trait WorkerDispatcher: Send + Sync {
    /// Dispatch `worker_id` with `input`. Returns the new job's id
    /// immediately regardless of mode (spec §4.5 `dispatch`).
    async fn dispatch(&self, worker_id: &str, input: serde_json::Value) -> Result<String, TrailheadError>;

    /// Block until `job_id` reaches a terminal status, then return its
    /// output (or the worker's failure, surfaced as `WorkerFailure`).
    async fn await_terminal(&self, job_id: &str) -> Result<serde_json::Value, TrailheadError>;
}

/// Resolves a `Step::Workflow`'s referenced id to a config, so orchestrations
/// can call each other without the engine owning a global registry.
pub trait WorkflowRegistry: Send + Sync {
    /// Look up a workflow by id.
    fn get(&self, id: &str) -> Option<Arc<OrchestrationConfig>>;
}

/// An in-memory [`WorkflowRegistry`] backed by a `HashMap`.
#[derive(Default)]
pub struct MapWorkflowRegistry {
    configs: HashMap<String, Arc<OrchestrationConfig>>,
}

impl MapWorkflowRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a config under its own `id`.
    pub fn register(mut self, config: OrchestrationConfig) -> Self {
        self.configs.insert(config.id.clone(), Arc::new(config));
        self
    }
}

impl WorkflowRegistry for MapWorkflowRegistry {
    fn get(&self, id: &str) -> Option<Arc<OrchestrationConfig>> {
        self.configs.get(id).cloned()
    }
}

/// The result of a completed or failed orchestration run.
#[derive(Debug)]
pub struct RunOutcome {
    /// The adapter-assigned run id.
    pub run_id: String,
    /// The final running context (steps, errors, last output).
    pub context: RunningContext,
}

fn adapter_err(e: AdapterError) -> TrailheadError {
    TrailheadError::AdapterFailure(e.to_string())
}

/// Interprets an [`OrchestrationConfig`]'s step graph over a
/// [`DurableAdapter`], calling agents through a [`Router`] and workers
/// through a [`WorkerDispatcher`] (spec §4.4 Orchestration Engine).
pub struct Engine {
    router: Router,
    adapter: Arc<dyn DurableAdapter>,
    workers: Arc<dyn WorkerDispatcher>,
    workflows: Arc<dyn WorkflowRegistry>,
}

impl Engine {
    /// Build an engine around a router, durable adapter, worker dispatcher,
    /// and workflow registry.
    pub fn new(
        router: Router,
        adapter: Arc<dyn DurableAdapter>,
        workers: Arc<dyn WorkerDispatcher>,
        workflows: Arc<dyn WorkflowRegistry>,
    ) -> Self {
        Self { router, adapter, workers, workflows }
    }

    /// Start and run `config` to completion (or failure / timeout),
    /// returning the final context (spec §8 scenario D, E).
    pub async fn run(&self, config: &OrchestrationConfig, input: serde_json::Value) -> Result<RunOutcome, TrailheadError> {
        let run_id = self.adapter.start_run(&config.id, input.clone()).await.map_err(adapter_err)?;
        self.run_with_id(&run_id, config, input).await
    }

    /// Start `config` running in the background and return its run id
    /// immediately, without waiting for completion (spec §6 `POST
    /// /workflows/orchestrate`: "start an orchestration; returns `{ runId,
    /// status }`" — callers poll [`Self::status`] rather than block on this
    /// call, the same shape as dispatching a worker and polling its job).
    pub async fn start(self: Arc<Self>, config: Arc<OrchestrationConfig>, input: serde_json::Value) -> Result<String, TrailheadError> {
        let run_id = self.adapter.start_run(&config.id, input.clone()).await.map_err(adapter_err)?;
        let rid = run_id.clone();
        tokio::spawn(async move {
            let _ = self.run_with_id(&rid, &config, input).await;
        });
        Ok(run_id)
    }

    async fn run_with_id(&self, run_id: &str, config: &OrchestrationConfig, input: serde_json::Value) -> Result<RunOutcome, TrailheadError> {
        let mut ctx = RunningContext::new(run_id, input);
        let deadline = config.options.timeout.map(|d| Instant::now() + d.as_duration());

        let result = self.run_steps(&config.steps, &config.options, &mut ctx, run_id, deadline, "0").await;

        match &result {
            Ok(()) => {
                let value = ctx.previous.clone().unwrap_or(serde_json::Value::Null);
                let _ = self.adapter.finish_run(run_id, Ok(value)).await;
            }
            Err(e) => {
                let _ = self.adapter.finish_run(run_id, Err(ErrorPayload::from_error(e))).await;
            }
        }

        result.map(|()| RunOutcome { run_id: run_id.to_string(), context: ctx })
    }

    /// Resume a paused hook (spec §4.4 guarantee 3) by delivering its
    /// payload to the adapter. This only signals — it must NOT re-drive the
    /// step graph. The run's original driver (the background task spawned
    /// by [`Self::start`], or whichever caller is blocked inside
    /// [`Self::run`]) is already parked in `await_hook` for this exact
    /// `(run_id, token)` and picks the payload up itself, committing its own
    /// checkpoint and continuing from there. Spawning a second `run_with_id`
    /// here would race that driver through every step after the hook,
    /// re-running side effects the first driver hasn't committed yet.
    /// Callers that need the final outcome should poll [`Self::status`]
    /// rather than call this twice for the same token — the adapter rejects
    /// a second delivery once the hook has already fired.
    pub async fn resume(&self, run_id: &str, token: &str, payload: serde_json::Value) -> Result<(), TrailheadError> {
        self.adapter.resume_hook(run_id, token, payload).await.map_err(adapter_err)
    }

    fn check_deadline(&self, deadline: Option<Instant>) -> Result<(), TrailheadError> {
        if let Some(d) = deadline {
            if Instant::now() >= d {
                return Err(TrailheadError::TimedOut(Duration::default()));
            }
        }
        Ok(())
    }

    fn run_steps<'a>(
        &'a self,
        steps: &'a [Step],
        opts: &'a OrchestrationOptions,
        ctx: &'a mut RunningContext,
        run_id: &'a str,
        deadline: Option<Instant>,
        prefix: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), TrailheadError>> + Send + 'a>> {
        Box::pin(async move {
            for (i, step) in steps.iter().enumerate() {
                self.check_deadline(deadline)?;
                let key = format!("{prefix}.{i}");
                match self.run_step(step, opts, ctx, run_id, deadline, &key).await {
                    Ok(Some(output)) => ctx.record(step.id(), output),
                    Ok(None) => {}
                    Err(e) => {
                        if opts.continue_on_error {
                            let id = step.id().unwrap_or(&key).to_string();
                            ctx.errors.push((id, ErrorPayload::from_error(&e)));
                        } else {
                            return Err(e);
                        }
                    }
                }
            }
            Ok(())
        })
    }

    fn run_step<'a>(
        &'a self,
        step: &'a Step,
        opts: &'a OrchestrationOptions,
        ctx: &'a mut RunningContext,
        run_id: &'a str,
        deadline: Option<Instant>,
        key: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Option<serde_json::Value>, TrailheadError>> + Send + 'a>> {
        Box::pin(async move {
            match step {
                Step::Agent { agent, input, r#await, .. } => {
                    let value = input.resolve(ctx);
                    if let Some(cached) = self.adapter.checkpoint(run_id, key).await.map_err(adapter_err)? {
                        return Ok(Some(cached));
                    }
                    let mut bag = Bag::new();
                    bag.insert("input", value);
                    if *r#await {
                        let result = self.router.call_agent(agent.clone(), bag, CallOptions::isolated(), None).await;
                        let output = if result.ok {
                            result.data.unwrap_or(serde_json::Value::Null)
                        } else {
                            let message = result.error.map(|e| e.message).unwrap_or_else(|| "agent call failed".into());
                            return Err(TrailheadError::HandlerFailure(message));
                        };
                        self.adapter.commit(run_id, key, output.clone()).await.map_err(adapter_err)?;
                        Ok(Some(output))
                    } else {
                        let router = self.router.clone();
                        let path: Path = agent.clone();
                        tokio::spawn(async move {
                            router.call_agent(path, bag, CallOptions::isolated(), None).await;
                        });
                        let placeholder = serde_json::json!({ "dispatched": true });
                        self.adapter.commit(run_id, key, placeholder.clone()).await.map_err(adapter_err)?;
                        Ok(Some(placeholder))
                    }
                }
                Step::Worker { worker, input, r#await, .. } => {
                    let value = input.resolve(ctx);
                    if let Some(cached) = self.adapter.checkpoint(run_id, key).await.map_err(adapter_err)? {
                        return Ok(Some(cached));
                    }
                    let job_id = self.workers.dispatch(worker, value).await?;
                    let output = if *r#await {
                        self.workers.await_terminal(&job_id).await?
                    } else {
                        serde_json::json!({ "jobId": job_id })
                    };
                    self.adapter.commit(run_id, key, output.clone()).await.map_err(adapter_err)?;
                    Ok(Some(output))
                }
                Step::Workflow { workflow, input, r#await, .. } => {
                    let value = input.resolve(ctx);
                    if let Some(cached) = self.adapter.checkpoint(run_id, key).await.map_err(adapter_err)? {
                        return Ok(Some(cached));
                    }
                    let config = self
                        .workflows
                        .get(workflow)
                        .ok_or_else(|| TrailheadError::NotFound(format!("workflow {workflow}")))?;
                    let output = if *r#await {
                        let nested = self.run(&config, value).await?;
                        nested.context.previous.clone().unwrap_or(serde_json::Value::Null)
                    } else {
                        let engine_router = self.router.clone();
                        let adapter = Arc::clone(&self.adapter);
                        let workers = Arc::clone(&self.workers);
                        let workflows = Arc::clone(&self.workflows);
                        let config = Arc::clone(&config);
                        tokio::spawn(async move {
                            let engine = Engine::new(engine_router, adapter, workers, workflows);
                            let _ = engine.run(&config, value).await;
                        });
                        serde_json::json!({ "dispatched": true })
                    };
                    self.adapter.commit(run_id, key, output.clone()).await.map_err(adapter_err)?;
                    Ok(Some(output))
                }
                Step::Hook { token, timeout, .. } => {
                    if let Some(cached) = self.adapter.checkpoint(run_id, key).await.map_err(adapter_err)? {
                        return Ok(Some(cached));
                    }
                    let resolved = token.resolve(ctx);
                    let wait = timeout.unwrap_or(opts.hook_timeout).as_duration();
                    let deadline_at = chrono::Utc::now() + chrono::Duration::from_std(wait).unwrap_or_default();
                    self.adapter
                        .mark_paused(run_id, Some(PendingHook { token: resolved.clone(), waiting_since: chrono::Utc::now(), deadline: deadline_at }))
                        .await
                        .map_err(adapter_err)?;
                    let payload = self
                        .adapter
                        .await_hook(run_id, key, &resolved, wait)
                        .await
                        .map_err(|e| match e {
                            AdapterError::HookTimeout(t) => TrailheadError::HookTimeout(t),
                            other => adapter_err(other),
                        })?;
                    self.adapter.mark_paused(run_id, None).await.map_err(adapter_err)?;
                    self.adapter.commit(run_id, key, payload.clone()).await.map_err(adapter_err)?;
                    Ok(Some(payload))
                }
                Step::Sleep { duration } => {
                    if self.adapter.checkpoint(run_id, key).await.map_err(adapter_err)?.is_some() {
                        return Ok(None);
                    }
                    self.adapter.sleep(run_id, key, duration.as_duration()).await.map_err(adapter_err)?;
                    self.adapter.commit(run_id, key, serde_json::Value::Bool(true)).await.map_err(adapter_err)?;
                    Ok(None)
                }
                Step::Condition { r#if, then, r#else } => {
                    let branch: &[Step] = if r#if(ctx) { then } else { r#else };
                    let sub_prefix = format!("{key}.c");
                    self.run_steps(branch, opts, ctx, run_id, deadline, &sub_prefix).await?;
                    Ok(None)
                }
                Step::Parallel { steps } => {
                    let mut handles = Vec::with_capacity(steps.len());
                    for (i, inner) in steps.iter().enumerate() {
                        let mut branch_ctx = ctx.clone();
                        let branch_key = format!("{key}.p{i}");
                        let fut = self.run_step(inner, opts, &mut branch_ctx, run_id, deadline, &branch_key);
                        handles.push(async move {
                            let result = fut.await;
                            (inner.id().map(str::to_string), branch_ctx, result)
                        });
                    }
                    let results = futures::future::join_all(handles).await;
                    let mut first_err = None;
                    for (id, branch_ctx, result) in results {
                        match result {
                            Ok(Some(output)) => {
                                let mut merged = branch_ctx;
                                merged.record(id.as_deref(), output);
                                ctx.merge_branch(merged);
                            }
                            Ok(None) => ctx.merge_branch(branch_ctx),
                            Err(e) => {
                                if opts.continue_on_error {
                                    let err_id = id.unwrap_or_else(|| key.to_string());
                                    ctx.errors.push((err_id, ErrorPayload::from_error(&e)));
                                } else if first_err.is_none() {
                                    first_err = Some(e);
                                }
                            }
                        }
                    }
                    match first_err {
                        Some(e) => Err(e),
                        None => Ok(None),
                    }
                }
            }
        })
    }

    /// Query a run's current status (spec §4.4 guarantee 4, §6 `GET
    /// /workflows/status`).
    pub async fn status(&self, run_id: &str) -> Result<crate::adapter::RunSnapshot, TrailheadError> {
        self.adapter.status(run_id).await.map_err(adapter_err)
    }
}
