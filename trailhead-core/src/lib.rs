#![deny(missing_docs)]
//! Wire types shared by every Trailhead crate: paths, messages, parts,
//! tool descriptors, job records, and the error taxonomy.
//!
//! Nothing in this crate talks to I/O — it is the vocabulary the router,
//! orchestration engine, and worker runtime all serialize over.

pub mod duration;
pub mod error;
pub mod job;
pub mod message;
pub mod part;
pub mod path;
pub mod queue;
pub mod request;
pub mod tool;

pub use duration::{DurationParseError, DurationSpec};
pub use error::{ErrorPayload, TrailheadError};
pub use job::{JobRecord, JobStatus, JobUpdate, LogEntry};
pub use message::{Message, MessageMetadata, Role};
pub use part::{Part, ToolState};
pub use path::Path;
pub use queue::{QueueJobRecord, QueueStatus, StepRecord, StepStatus};
pub use request::{Bag, Request};
pub use tool::{ToolDescriptor, ToolMetadata};
