//! The running context threaded through a workflow's `input`/`if` functions
//! (spec §4.4: "`{ input, steps (by id), previous, all (ordered), runId,
//! errors }`").

use std::collections::HashMap;
use trailhead_core::ErrorPayload;

/// The state accumulated while a workflow runs. Cloned to give each branch
/// of a [`crate::Step::Parallel`] an isolated view of everything completed
/// so far (spec §4.4: inner steps "start concurrently").
#[derive(Debug, Clone)]
pub struct RunningContext {
    /// This run's durable identifier.
    pub run_id: String,
    /// The value the workflow was started with.
    pub input: serde_json::Value,
    /// Awaited output (or placeholder) of every prior step that declared an
    /// `id`, keyed by that id.
    pub steps: HashMap<String, serde_json::Value>,
    /// The immediately preceding step's output.
    pub previous: Option<serde_json::Value>,
    /// Every step's output, in execution order.
    pub all: Vec<serde_json::Value>,
    /// Failures recorded under `continueOnError`, keyed by step id (or
    /// index, for steps without one).
    pub errors: Vec<(String, ErrorPayload)>,
}

impl RunningContext {
    /// Start a fresh context for a new run.
    pub fn new(run_id: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            run_id: run_id.into(),
            input,
            steps: HashMap::new(),
            previous: None,
            all: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Record a completed step's output.
    pub fn record(&mut self, id: Option<&str>, output: serde_json::Value) {
        if let Some(id) = id {
            self.steps.insert(id.to_string(), output.clone());
        }
        self.previous = Some(output.clone());
        self.all.push(output);
    }

    /// Merge a parallel branch's deltas (new `steps`/`errors`/`all` entries)
    /// into this context once every branch has completed.
    pub fn merge_branch(&mut self, branch: RunningContext) {
        self.steps.extend(branch.steps);
        self.errors.extend(branch.errors);
        if let Some(last) = branch.all.last() {
            self.previous = Some(last.clone());
        }
        self.all.extend(branch.all);
    }
}
