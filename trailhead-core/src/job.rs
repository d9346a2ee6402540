//! Job records for the worker runtime (spec §3 Job Record, §4.5).

use crate::error::ErrorPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a dispatched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not yet running.
    Queued,
    /// Currently executing.
    Running,
    /// Finished successfully. Terminal.
    Completed,
    /// Finished with an error. Terminal.
    Failed,
}

impl JobStatus {
    /// Terminal statuses are immutable once reached (spec §3 invariant).
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A single append-only log line recorded by a worker's `ctx.logger`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// The log line.
    pub message: String,
}

impl LogEntry {
    /// Record a log entry with the current time.
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}

/// A background job's status, progress, and result (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier.
    pub job_id: String,
    /// The worker this job was dispatched to.
    pub worker_id: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Progress percentage, 0-100. Monotonic non-decreasing within a status.
    pub progress_pct: u8,
    /// Human-readable progress description.
    pub progress_message: Option<String>,
    /// Append-only log.
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    /// Input frozen at create time.
    pub input: serde_json::Value,
    /// Output, populated only once `status == Completed`.
    pub output: Option<serde_json::Value>,
    /// Error, populated only once `status == Failed`.
    pub error: Option<ErrorPayload>,
    /// Caller-supplied metadata, opaque to the runtime.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the job started running, if it has.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal status, if it has.
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Create a freshly queued record.
    pub fn new(job_id: impl Into<String>, worker_id: impl Into<String>, input: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            worker_id: worker_id.into(),
            status: JobStatus::Queued,
            progress_pct: 0,
            progress_message: None,
            logs: Vec::new(),
            input,
            output: None,
            error: None,
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Optional fields patched into a [`JobRecord`] by `ctx.jobStore.update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobUpdate {
    /// New status, if transitioning.
    pub status: Option<JobStatus>,
    /// New progress percentage.
    pub progress_pct: Option<u8>,
    /// New progress message.
    pub progress_message: Option<String>,
    /// A log line to append.
    pub append_log: Option<String>,
    /// Output to attach (only meaningful alongside `status = Completed`).
    pub output: Option<serde_json::Value>,
    /// Error to attach (only meaningful alongside `status = Failed`).
    pub error: Option<ErrorPayload>,
}
