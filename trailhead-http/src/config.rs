//! Process-start configuration (spec §6 "Environment variables", §9
//! "explicit `Application`/`TrailheadConfig` aggregate instead of
//! singletons"): every optional binding falls back to the local/in-memory
//! reference implementations so the whole stack runs with zero
//! configuration in dev mode, mirroring `neuron-env-local`'s
//! no-configuration-required design.

use std::env;

/// Configuration read once at process start from the environment.
#[derive(Debug, Clone, Default)]
pub struct TrailheadConfig {
    /// Selects the durable-workflow adapter. `"local"` (the default) uses
    /// the in-memory reference [`trailhead_orch_local::InMemoryAdapter`].
    pub workflow_provider: Option<String>,
    /// Base URL of a remote worker-trigger service. When unset, worker
    /// dispatch is local-only.
    pub worker_base_url: Option<String>,
    /// Bearer key sent with remote worker dispatch requests
    /// (`WorkerRuntime`'s `remote_api_key`). Distinct from
    /// `webhook_secret` below — this one never touches webhook signing.
    pub workers_trigger_api_key: Option<String>,
    /// HMAC key outgoing webhook callbacks are signed with, and that
    /// `POST /workers/callback` compares an inbound `x-webhook-signature`
    /// header against. Unset disables both signing and verification.
    pub webhook_secret: Option<String>,
    /// Filesystem path for the collaborator chat-store session layer, when
    /// the deployment wants durable sessions instead of in-memory ones.
    pub chat_store_path: Option<String>,
}

impl TrailheadConfig {
    /// Read configuration from the process environment. Every field is
    /// optional; missing variables fall back to local defaults rather than
    /// erroring (spec.md §9 expansion).
    pub fn from_env() -> Self {
        Self {
            workflow_provider: env::var("WORKFLOW_PROVIDER").ok(),
            worker_base_url: env::var("WORKER_BASE_URL").ok(),
            workers_trigger_api_key: env::var("WORKERS_TRIGGER_API_KEY").ok(),
            webhook_secret: env::var("WEBHOOK_SECRET").ok(),
            chat_store_path: env::var("CHAT_STORE_PATH").ok(),
        }
    }
}
