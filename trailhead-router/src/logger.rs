//! A thin per-invocation logging handle (spec §3 Context: "logger").
//!
//! Wraps a `tracing::Span` scoped to the request's path so every log line an
//! agent or middleware emits is automatically tagged with where it came
//! from, mirroring how `neuron-tool`/`neuron-mcp`/`serve` use `tracing`
//! spans rather than ad hoc `println!`.

use trailhead_core::Path;

/// Structured logging sink threaded through [`crate::Context`].
#[derive(Clone)]
pub struct Logger {
    span: tracing::Span,
}

impl Logger {
    /// Build a logger scoped to `path`.
    pub fn for_path(path: &Path) -> Self {
        Self {
            span: tracing::info_span!("agent", path = %path),
        }
    }

    /// Log at `info` level within this logger's span.
    pub fn info(&self, message: &str) {
        let _guard = self.span.enter();
        tracing::info!("{message}");
    }

    /// Log at `warn` level within this logger's span.
    pub fn warn(&self, message: &str) {
        let _guard = self.span.enter();
        tracing::warn!("{message}");
    }

    /// Log at `error` level within this logger's span.
    pub fn error(&self, message: &str) {
        let _guard = self.span.enter();
        tracing::error!("{message}");
    }
}
