//! Queue job records for multi-step worker chains (spec §3 Queue Job
//! Record, §4.5 Queue).

use crate::error::ErrorPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a single step within a [`QueueJobRecord`]. Advances only
/// `queued -> running -> {completed, failed}`; a failed step marks the
/// remaining steps `skipped` rather than executing them (fail-fast, spec
/// §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet started.
    Queued,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Not executed because an earlier step in the chain failed.
    Skipped,
}

/// One step's record within a [`QueueJobRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Position within the queue's step list.
    pub step_index: usize,
    /// The worker this step dispatches to.
    pub worker_id: String,
    /// The underlying job id once dispatched.
    pub worker_job_id: Option<String>,
    /// Current status.
    pub status: StepStatus,
    /// Input this step ran (or will run) with.
    pub input: Option<serde_json::Value>,
    /// Output produced, if completed.
    pub output: Option<serde_json::Value>,
    /// Error, if failed.
    pub error: Option<ErrorPayload>,
    /// When the step started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the step reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

impl StepRecord {
    /// A freshly queued step, not yet dispatched.
    pub fn pending(step_index: usize, worker_id: impl Into<String>) -> Self {
        Self {
            step_index,
            worker_id: worker_id.into(),
            worker_job_id: None,
            status: StepStatus::Queued,
            input: None,
            output: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Overall status of a [`QueueJobRecord`], derived from its steps (spec §3
/// invariant: "queue status is derived").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// No step has started yet.
    Queued,
    /// At least one step is running.
    Running,
    /// The last step completed successfully.
    Completed,
    /// At least one step failed.
    Failed,
}

/// An ordered chain of worker dispatches with inter-step delays (spec §3,
/// §4.5 `WorkerQueueConfig`/Queue Job Record).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueJobRecord {
    /// Unique identifier for this queue run.
    pub queue_job_id: String,
    /// The `WorkerQueueConfig::id` this run executes.
    pub queue_id: String,
    /// Per-step records, in declared order.
    pub steps: Vec<StepRecord>,
    /// Derived overall status.
    pub status: QueueStatus,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// When the run was last updated.
    pub updated_at: DateTime<Utc>,
}

impl QueueJobRecord {
    /// Create a new run with every step `queued`.
    pub fn new(queue_job_id: impl Into<String>, queue_id: impl Into<String>, worker_ids: &[String]) -> Self {
        let now = Utc::now();
        Self {
            queue_job_id: queue_job_id.into(),
            queue_id: queue_id.into(),
            steps: worker_ids
                .iter()
                .enumerate()
                .map(|(i, w)| StepRecord::pending(i, w.clone()))
                .collect(),
            status: QueueStatus::Queued,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute `status` from the current step statuses (spec §3: "queue
    /// status is derived").
    pub fn recompute_status(&mut self) {
        self.status = derive_status(&self.steps);
        self.updated_at = Utc::now();
    }
}

fn derive_status(steps: &[StepRecord]) -> QueueStatus {
    if steps.iter().any(|s| s.status == StepStatus::Failed) {
        return QueueStatus::Failed;
    }
    if steps.iter().any(|s| s.status == StepStatus::Running) {
        return QueueStatus::Running;
    }
    match steps.last().map(|s| s.status) {
        Some(StepStatus::Completed) => QueueStatus::Completed,
        Some(StepStatus::Skipped) | None => {
            if steps.iter().all(|s| s.status == StepStatus::Queued) {
                QueueStatus::Queued
            } else {
                QueueStatus::Failed
            }
        }
        _ => QueueStatus::Queued,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_running_while_any_step_runs() {
        let mut q = QueueJobRecord::new("q1", "pipeline", &["a".into(), "b".into()]);
        q.steps[0].status = StepStatus::Running;
        q.recompute_status();
        assert_eq!(q.status, QueueStatus::Running);
    }

    #[test]
    fn status_is_completed_when_last_step_completes() {
        let mut q = QueueJobRecord::new("q1", "pipeline", &["a".into(), "b".into()]);
        q.steps[0].status = StepStatus::Completed;
        q.steps[1].status = StepStatus::Completed;
        q.recompute_status();
        assert_eq!(q.status, QueueStatus::Completed);
    }

    #[test]
    fn failed_step_fails_the_queue_and_skips_rest() {
        let mut q = QueueJobRecord::new("q1", "pipeline", &["a".into(), "b".into(), "c".into()]);
        q.steps[0].status = StepStatus::Completed;
        q.steps[1].status = StepStatus::Failed;
        q.steps[2].status = StepStatus::Skipped;
        q.recompute_status();
        assert_eq!(q.status, QueueStatus::Failed);
    }
}
