//! [`Step`] and [`OrchestrationConfig`] (spec §4.4): the declarative step
//! graph the engine interprets.

use crate::context::RunningContext;
use std::sync::Arc;
use trailhead_core::{DurationSpec, Path};

/// A value computed either once at config time, or as a function of the
/// [`RunningContext`] at the moment the step runs (spec §4.4: "Input is
/// either a static value or a function of the running context").
#[derive(Clone)]
pub enum InputSpec {
    /// A fixed value, independent of prior steps.
    Static(serde_json::Value),
    /// Computed from whatever has run so far.
    Dynamic(Arc<dyn Fn(&RunningContext) -> serde_json::Value + Send + Sync>),
}

impl InputSpec {
    /// Resolve against the current running context.
    pub fn resolve(&self, ctx: &RunningContext) -> serde_json::Value {
        match self {
            InputSpec::Static(v) => v.clone(),
            InputSpec::Dynamic(f) => f(ctx),
        }
    }
}

impl From<serde_json::Value> for InputSpec {
    fn from(v: serde_json::Value) -> Self {
        InputSpec::Static(v)
    }
}

impl std::fmt::Debug for InputSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSpec::Static(v) => f.debug_tuple("Static").field(v).finish(),
            InputSpec::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A hook's resume token: a fixed string, or a function of the running
/// context that MUST be deterministic so replay computes the same token
/// (spec §4.4 "Hook tokens").
#[derive(Clone)]
pub enum HookToken {
    /// A fixed, caller-chosen token.
    Static(String),
    /// Computed deterministically from the running context.
    Dynamic(Arc<dyn Fn(&RunningContext) -> String + Send + Sync>),
}

impl HookToken {
    /// Resolve the token for this run. Computed once at step-scheduling
    /// time and recorded, per spec, for idempotent replay.
    pub fn resolve(&self, ctx: &RunningContext) -> String {
        match self {
            HookToken::Static(s) => s.clone(),
            HookToken::Dynamic(f) => f(ctx),
        }
    }
}

impl From<&str> for HookToken {
    fn from(s: &str) -> Self {
        HookToken::Static(s.to_string())
    }
}

impl From<String> for HookToken {
    fn from(s: String) -> Self {
        HookToken::Static(s)
    }
}

impl std::fmt::Debug for HookToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookToken::Static(s) => f.debug_tuple("Static").field(s).finish(),
            HookToken::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A predicate over the running context, used by [`Step::Condition`].
pub type ConditionFn = Arc<dyn Fn(&RunningContext) -> bool + Send + Sync>;

/// One node of an [`OrchestrationConfig`] step graph (spec §4.4).
#[derive(Clone)]
pub enum Step {
    /// Invoke an agent by path.
    Agent {
        /// Optional identifier, used to reference this step's output from
        /// later steps via `ctx.steps[id]`.
        id: Option<String>,
        /// The agent's absolute path.
        agent: Path,
        /// Input to pass, resolved at the moment the step runs.
        input: InputSpec,
        /// When true (the default), block on the agent's final result.
        /// When false, dispatch and proceed, recording a placeholder.
        r#await: bool,
    },
    /// Dispatch a worker (spec §4.5).
    Worker {
        /// Optional identifier.
        id: Option<String>,
        /// The worker's registered id.
        worker: String,
        /// Input to pass.
        input: InputSpec,
        /// When true, block until the job reaches a terminal status.
        /// Default false (returns a `jobId` placeholder).
        r#await: bool,
    },
    /// Call another orchestration by id.
    Workflow {
        /// Optional identifier.
        id: Option<String>,
        /// The referenced workflow's id.
        workflow: String,
        /// Input to pass.
        input: InputSpec,
        /// When true (the default), block on the sub-workflow's result.
        r#await: bool,
    },
    /// Suspend durably until an external resume delivers a payload under
    /// a matching token (HITL; spec §4.4 Hook step).
    Hook {
        /// Optional identifier.
        id: Option<String>,
        /// The resume token this hook waits on.
        token: HookToken,
        /// Timeout for this hook; falls back to the run's `hook_timeout`.
        timeout: Option<DurationSpec>,
    },
    /// A durable timer.
    Sleep {
        /// How long to park the run.
        duration: DurationSpec,
    },
    /// Exactly one branch executes, chosen by evaluating `if` against the
    /// running context.
    Condition {
        /// The predicate.
        r#if: ConditionFn,
        /// Steps run when the predicate is true.
        then: Vec<Step>,
        /// Steps run when the predicate is false.
        r#else: Vec<Step>,
    },
    /// All inner steps start concurrently; this step completes once every
    /// inner step has completed (spec §4.4 Parallel step).
    Parallel {
        /// The concurrently-executed steps.
        steps: Vec<Step>,
    },
}

impl Step {
    /// This step's declared id, if any. `Condition`/`Parallel`/`Sleep`
    /// never carry one directly — their children do.
    pub fn id(&self) -> Option<&str> {
        match self {
            Step::Agent { id, .. } | Step::Worker { id, .. } | Step::Workflow { id, .. } | Step::Hook { id, .. } => {
                id.as_deref()
            }
            Step::Sleep { .. } | Step::Condition { .. } | Step::Parallel { .. } => None,
        }
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Agent { id, agent, r#await, .. } => f
                .debug_struct("Agent")
                .field("id", id)
                .field("agent", agent)
                .field("await", r#await)
                .finish(),
            Step::Worker { id, worker, r#await, .. } => f
                .debug_struct("Worker")
                .field("id", id)
                .field("worker", worker)
                .field("await", r#await)
                .finish(),
            Step::Workflow { id, workflow, r#await, .. } => f
                .debug_struct("Workflow")
                .field("id", id)
                .field("workflow", workflow)
                .field("await", r#await)
                .finish(),
            Step::Hook { id, token, timeout } => f
                .debug_struct("Hook")
                .field("id", id)
                .field("token", token)
                .field("timeout", timeout)
                .finish(),
            Step::Sleep { duration } => f.debug_struct("Sleep").field("duration", duration).finish(),
            Step::Condition { then, r#else, .. } => f
                .debug_struct("Condition")
                .field("then", &then.len())
                .field("else", &r#else.len())
                .finish(),
            Step::Parallel { steps } => f.debug_struct("Parallel").field("steps", &steps.len()).finish(),
        }
    }
}

/// Global options for a single orchestration run (spec §4.4).
#[derive(Clone)]
pub struct OrchestrationOptions {
    /// Where to reach agents over HTTP when the engine is decoupled from
    /// the router process. `None` means in-process invocation.
    pub base_url: Option<String>,
    /// Initial chat history passed to agent steps.
    pub messages: Vec<trailhead_core::Message>,
    /// Default timeout per hook.
    pub hook_timeout: DurationSpec,
    /// If true, step failures are recorded into `ctx.errors` and execution
    /// proceeds. If false (the default), the first failure terminates the
    /// run fail-fast.
    pub continue_on_error: bool,
    /// Overall orchestration deadline.
    pub timeout: Option<DurationSpec>,
}

impl Default for OrchestrationOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            messages: Vec::new(),
            hook_timeout: DurationSpec::default(),
            continue_on_error: false,
            timeout: None,
        }
    }
}

/// A finite, ordered list of [`Step`]s plus the options that govern how
/// they run (spec §4.4 `OrchestrationConfig`).
#[derive(Clone)]
pub struct OrchestrationConfig {
    /// Stable identifier for this config, referenced by `Step::Workflow`.
    pub id: String,
    /// The step graph, in declared order.
    pub steps: Vec<Step>,
    /// Global options.
    pub options: OrchestrationOptions,
}

impl OrchestrationConfig {
    /// Start building a config with an id and an empty step list.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
            options: OrchestrationOptions::default(),
        }
    }

    /// Append a step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Replace the options.
    pub fn with_options(mut self, options: OrchestrationOptions) -> Self {
        self.options = options;
        self
    }
}
