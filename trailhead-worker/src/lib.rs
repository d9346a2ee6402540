#![deny(missing_docs)]
//! The Job Store and typed Worker Runtime (spec §4.5, components F and G):
//! local/remote dispatch, progress tracking, webhook delivery, and
//! multi-step worker queues.

mod hmac;
pub mod queue;
pub mod store;
pub mod worker;

pub use queue::{MapInputFromPrev, QueueError, QueueJobStore, QueueRunner, QueueStep, WorkerQueueConfig};
pub use store::{FsJobStore, JobStore, JobStoreError, MemoryJobStore};
pub use worker::{DispatchMode, DispatchOptions, Worker, WorkerConfig, WorkerContext, WorkerError, WorkerRuntime};

/// Verify an inbound `x-webhook-signature` header against `secret` over the
/// raw request body (spec §6 `POST /workers/callback`: "on mismatch
/// returns `401`").
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    hmac::verify(secret, body, signature)
}
