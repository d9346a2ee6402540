#![deny(missing_docs)]
//! The response stream: a lazy, append-only sequence of typed message
//! parts (spec §3 Response/Stream).
//!
//! A stream is a bounded channel with a writer half ([`ResponseWriter`])
//! and a reader half ([`ResponseStream`]). Sub-streams merge by spawning a
//! forwarding task per source, preserving each source's internal order
//! while interleaving FIFO by emission time (spec §5).

pub mod materialize;
pub mod writer;

pub use materialize::{materialize, AwaitResponse, MaterializedToolCall};
pub use writer::{channel, merge_into, ResponseStream, ResponseWriter};

/// Default channel capacity used by [`writer::channel`] when callers don't
/// have a specific backpressure budget in mind.
pub const DEFAULT_CAPACITY: usize = 64;
