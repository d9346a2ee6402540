//! Error taxonomy shared across the router, orchestration, and worker
//! subsystems (spec §7).

use thiserror::Error;

/// Errors surfaced by the router, tool registry, orchestration engine, and
/// worker runtime.
///
/// Every variant that wraps a lower-level failure carries the message as a
/// `String` rather than the source error, so the type stays `Send + Sync +
/// 'static` across the `async_trait` boundaries used throughout the
/// workspace. Use [`TrailheadError::Other`] for anything that doesn't fit.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TrailheadError {
    /// No handler registered at the requested path.
    #[error("not found: {0}")]
    NotFound(String),

    /// An agent or middleware was registered twice at the same path.
    #[error("duplicate route: {0}")]
    DuplicateRoute(String),

    /// Two tool descriptors derived the same stable id or tool key.
    #[error("duplicate tool id: {0}")]
    DuplicateToolId(String),

    /// Input or output failed schema validation.
    #[error("schema violation in {context}: {message}")]
    SchemaViolation {
        /// Where validation failed (tool id, step id, ...).
        context: String,
        /// Human-readable validation failure.
        message: String,
    },

    /// A middleware called `next` more than once.
    #[error("middleware called next more than once at {0}")]
    MiddlewareReentry(String),

    /// A handler or middleware panicked or returned an error.
    #[error("handler failed: {0}")]
    HandlerFailure(String),

    /// A hook resume arrived with an unknown or already-resumed token.
    #[error("invalid hook token: {0}")]
    InvalidHook(String),

    /// A hook was not resumed within its timeout.
    #[error("hook timed out: {0}")]
    HookTimeout(String),

    /// The orchestration's global timeout elapsed before completion.
    #[error("orchestration timed out after {0:?}")]
    TimedOut(std::time::Duration),

    /// A worker handler reported failure.
    #[error("worker failed: {0}")]
    WorkerFailure(String),

    /// The durable-workflow adapter reported a lower-level fault.
    #[error("adapter failure: {0}")]
    AdapterFailure(String),

    /// The caller cancelled the in-flight invocation.
    #[error("cancelled")]
    Cancelled,

    /// Catch-all for errors that don't fit another variant.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl TrailheadError {
    /// Wrap an arbitrary error in [`TrailheadError::Other`].
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(err))
    }
}

/// Serialized form of a failure, used on [`crate::part::Part::Error`] and
/// on job/step records (spec §3 Job Record, §7).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorPayload {
    /// Human-readable message.
    pub message: String,
    /// Optional error type name (`NotFound`, `WorkerFailure`, ...).
    pub name: Option<String>,
    /// Optional stack trace, only ever populated in development builds.
    pub stack: Option<String>,
}

impl ErrorPayload {
    /// Build a payload from a [`TrailheadError`], naming its variant.
    pub fn from_error(err: &TrailheadError) -> Self {
        Self {
            message: err.to_string(),
            name: Some(variant_name(err)),
            stack: None,
        }
    }
}

fn variant_name(err: &TrailheadError) -> String {
    match err {
        TrailheadError::NotFound(_) => "NotFound",
        TrailheadError::DuplicateRoute(_) => "DuplicateRoute",
        TrailheadError::DuplicateToolId(_) => "DuplicateToolId",
        TrailheadError::SchemaViolation { .. } => "SchemaViolation",
        TrailheadError::MiddlewareReentry(_) => "MiddlewareReentry",
        TrailheadError::HandlerFailure(_) => "HandlerFailure",
        TrailheadError::InvalidHook(_) => "InvalidHook",
        TrailheadError::HookTimeout(_) => "HookTimeout",
        TrailheadError::TimedOut(_) => "TimedOut",
        TrailheadError::WorkerFailure(_) => "WorkerFailure",
        TrailheadError::AdapterFailure(_) => "AdapterFailure",
        TrailheadError::Cancelled => "Cancelled",
        _ => "Other",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_payload_names_the_variant() {
        let err = TrailheadError::NotFound("/x".into());
        let payload = ErrorPayload::from_error(&err);
        assert_eq!(payload.name.as_deref(), Some("NotFound"));
        assert_eq!(payload.message, "not found: /x");
        assert!(payload.stack.is_none());
    }
}
