//! The Job Store (spec §4.5, component F): an abstract key-value store for
//! worker-job records.
//!
//! Grounded on `agent-runtime::session::SessionStorage` — the same
//! `save`/`load`/`list`/`delete` shape and the `InMemory*`/`File*` backend
//! split (mirroring `InMemorySessionStorage`/`FileSessionStorage`, including
//! the `tokio::fs` `NotFound`-vs-`Io` error mapping), widened with an
//! `update` that merges a [`JobUpdate`] atomically and enforces the spec §3
//! invariants: terminal status is immutable, and `progress_pct` is
//! monotonic non-decreasing within a status.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use trailhead_core::{JobRecord, JobStatus, JobUpdate};

/// Failures a [`JobStore`] backend can report.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum JobStoreError {
    /// No job exists under the given id.
    #[error("job not found: {0}")]
    NotFound(String),

    /// The job already reached a terminal status; further updates are
    /// rejected (spec §3 invariant: "terminal status is immutable").
    #[error("job {0} is already terminal")]
    Terminal(String),

    /// The backend's underlying I/O failed.
    #[error("job store io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored record didn't deserialize.
    #[error("job store serialization error: {0}")]
    Serialization(String),

    /// Catch-all for anything else.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Storage surface for [`JobRecord`]s (spec §4.5, §5 "Shared resources": the
/// only shared mutable surface within worker execution; updates MUST be
/// atomic per-job).
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a brand-new record. Overwrites any existing record with the
    /// same id — callers that need create-if-absent idempotency should
    /// check [`JobStore::get`] first (this is what
    /// [`crate::worker::WorkerRuntime::dispatch`] does for `jobId` reuse).
    async fn put(&self, record: JobRecord) -> Result<(), JobStoreError>;

    /// Fetch a record by id.
    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, JobStoreError>;

    /// Atomically merge `update` into the record at `job_id` and return the
    /// resulting record. Rejects the update if the record is already
    /// terminal, and clamps `progress_pct` to monotonic non-decreasing
    /// within the current status.
    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<JobRecord, JobStoreError>;

    /// List every record, in an unspecified but stable order.
    async fn list(&self) -> Result<Vec<JobRecord>, JobStoreError>;
}

fn apply_update(mut record: JobRecord, update: JobUpdate) -> Result<JobRecord, JobStoreError> {
    if record.status.is_terminal() {
        return Err(JobStoreError::Terminal(record.job_id));
    }
    let now = Utc::now();
    if let Some(status) = update.status {
        if status == JobStatus::Running && record.started_at.is_none() {
            record.started_at = Some(now);
        }
        if status.is_terminal() {
            record.finished_at = Some(now);
        }
        record.status = status;
    }
    if let Some(pct) = update.progress_pct {
        record.progress_pct = record.progress_pct.max(pct);
    }
    if let Some(message) = update.progress_message {
        record.progress_message = Some(message);
    }
    if let Some(line) = update.append_log {
        record.logs.push(trailhead_core::job::LogEntry::now(line));
    }
    if let Some(output) = update.output {
        record.output = Some(output);
    }
    if let Some(error) = update.error {
        record.error = Some(error);
    }
    record.updated_at = now;
    Ok(record)
}

/// An in-memory [`JobStore`], suitable for tests, single-process local
/// dispatch, and short-lived processes.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<RwLock<HashMap<String, JobRecord>>>,
}

impl MemoryJobStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, record: JobRecord) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        jobs.insert(record.job_id.clone(), record);
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, JobStoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(job_id).cloned())
    }

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<JobRecord, JobStoreError> {
        let mut jobs = self.jobs.write().await;
        let existing = jobs.get(job_id).cloned().ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;
        let updated = apply_update(existing, update)?;
        jobs.insert(job_id.to_string(), updated.clone());
        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<JobRecord>, JobStoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.values().cloned().collect())
    }
}

/// A [`JobStore`] backed by one JSON file per job under `directory`.
#[derive(Clone)]
pub struct FsJobStore {
    directory: PathBuf,
    // Serializes read-modify-write cycles so concurrent `update` calls for
    // distinct jobs don't race on directory creation, and same-job updates
    // stay atomic per spec §5.
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl FsJobStore {
    /// Store job records under `directory`, creating it lazily on first
    /// write.
    pub fn new(directory: PathBuf) -> Self {
        Self { directory, lock: Arc::new(tokio::sync::Mutex::new(())) }
    }

    fn path_for(&self, job_id: &str) -> PathBuf {
        self.directory.join(format!("{job_id}.json"))
    }

    async fn read(&self, job_id: &str) -> Result<JobRecord, JobStoreError> {
        let path = self.path_for(job_id);
        let data = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                JobStoreError::NotFound(job_id.to_string())
            } else {
                JobStoreError::Io(e)
            }
        })?;
        serde_json::from_str(&data).map_err(|e| JobStoreError::Serialization(e.to_string()))
    }

    async fn write(&self, record: &JobRecord) -> Result<(), JobStoreError> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let json = serde_json::to_string_pretty(record).map_err(|e| JobStoreError::Serialization(e.to_string()))?;
        tokio::fs::write(self.path_for(&record.job_id), json).await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for FsJobStore {
    async fn put(&self, record: JobRecord) -> Result<(), JobStoreError> {
        let _guard = self.lock.lock().await;
        self.write(&record).await
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, JobStoreError> {
        match self.read(job_id).await {
            Ok(record) => Ok(Some(record)),
            Err(JobStoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<JobRecord, JobStoreError> {
        let _guard = self.lock.lock().await;
        let existing = self.read(job_id).await?;
        let updated = apply_update(existing, update)?;
        self.write(&updated).await?;
        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<JobRecord>, JobStoreError> {
        let mut records = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(JobStoreError::Io(e)),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let data = tokio::fs::read_to_string(&path).await?;
                if let Ok(record) = serde_json::from_str::<JobRecord>(&data) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_is_rejected_once_terminal() {
        let store = MemoryJobStore::new();
        store.put(JobRecord::new("j1", "w1", serde_json::Value::Null)).await.unwrap();
        store
            .update("j1", JobUpdate { status: Some(JobStatus::Completed), output: Some(serde_json::json!(1)), ..Default::default() })
            .await
            .unwrap();
        let err = store.update("j1", JobUpdate { progress_pct: Some(50), ..Default::default() }).await.unwrap_err();
        assert!(matches!(err, JobStoreError::Terminal(_)));
    }

    #[tokio::test]
    async fn progress_pct_is_monotonic_within_a_status() {
        let store = MemoryJobStore::new();
        store.put(JobRecord::new("j1", "w1", serde_json::Value::Null)).await.unwrap();
        store.update("j1", JobUpdate { progress_pct: Some(40), ..Default::default() }).await.unwrap();
        let record = store.update("j1", JobUpdate { progress_pct: Some(10), ..Default::default() }).await.unwrap();
        assert_eq!(record.progress_pct, 40);
    }

    #[tokio::test]
    async fn fs_store_round_trips_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsJobStore::new(dir.path().to_path_buf());
        store.put(JobRecord::new("j2", "w1", serde_json::json!({"a":1}))).await.unwrap();

        let reopened = FsJobStore::new(dir.path().to_path_buf());
        let loaded = reopened.get("j2").await.unwrap().unwrap();
        assert_eq!(loaded.job_id, "j2");
    }

    #[tokio::test]
    async fn fs_store_missing_job_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsJobStore::new(dir.path().to_path_buf());
        assert!(store.get("absent").await.unwrap().is_none());
    }
}
