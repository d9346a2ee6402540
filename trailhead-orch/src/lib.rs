#![deny(missing_docs)]
//! The durable step-graph orchestration engine (spec §4.4, component H)
//! and the provider-agnostic Durable Adapter Port (component I) it runs
//! steps over.
//!
//! This crate owns control flow only — it never embeds a specific
//! durable-workflow provider's types (spec §4.4, §9 "Durable workflow as a
//! port"). `trailhead-orch-local` ships the reference in-memory adapter.

pub mod adapter;
pub mod context;
pub mod engine;
pub mod step;

pub use adapter::{AdapterError, DurableAdapter, PendingHook, RunSnapshot, RunStatus};
pub use context::RunningContext;
pub use engine::{Engine, MapWorkflowRegistry, RunOutcome, WorkerDispatcher, WorkflowRegistry};
pub use step::{ConditionFn, HookToken, InputSpec, OrchestrationConfig, OrchestrationOptions, Step};
