//! End-to-end smoke test over a real bound socket (spec §8 scenario F:
//! "worker dispatch and polling" and the orchestration hook/resume path),
//! grounded on `hi-youichi-loom/serve`'s tests binding `127.0.0.1:0` and
//! driving the server with a real client rather than calling handlers
//! in-process.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;

use trailhead_http::{AppState, TrailheadConfig};
use trailhead_orch::engine::{MapWorkflowRegistry, WorkerDispatcher};
use trailhead_orch::step::{HookToken, InputSpec, OrchestrationConfig, Step};
use trailhead_orch::Engine;
use trailhead_router::{agent_fn, RouterBuilder};
use trailhead_worker::{MemoryJobStore, Worker, WorkerConfig, WorkerContext, WorkerRuntime};

struct Double;
#[async_trait]
impl Worker for Double {
    fn id(&self) -> &str {
        "double"
    }
    fn config(&self) -> &WorkerConfig {
        static CONFIG: std::sync::OnceLock<WorkerConfig> = std::sync::OnceLock::new();
        CONFIG.get_or_init(WorkerConfig::default)
    }
    async fn handle(&self, input: serde_json::Value, _ctx: WorkerContext) -> Result<serde_json::Value, String> {
        Ok(serde_json::json!(input.as_i64().unwrap_or(0) * 2))
    }
}

fn test_router() -> trailhead_router::Router {
    RouterBuilder::new()
        .agent(
            "/echo",
            Arc::new(agent_fn(|ctx| {
                Box::pin(async move {
                    let input = ctx.request.params.get::<serde_json::Value>("input").unwrap_or(serde_json::Value::Null);
                    Ok(Some(input))
                })
            })),
        )
        .unwrap()
        .build()
        .unwrap()
}

async fn spawn_server() -> (String, reqwest::Client) {
    spawn_server_with_config(TrailheadConfig::default()).await
}

async fn spawn_server_with_config(config: TrailheadConfig) -> (String, reqwest::Client) {
    let hook_config = OrchestrationConfig::new("approval").step(Step::Hook {
        id: Some("h".into()),
        token: HookToken::from("approve-1"),
        timeout: None,
    });
    let agent_config = OrchestrationConfig::new("greet").step(Step::Agent {
        id: Some("a".into()),
        agent: "/echo".into(),
        input: InputSpec::Static(serde_json::json!("hi")),
        r#await: true,
    });

    let router = test_router();
    let adapter = Arc::new(trailhead_orch_local::InMemoryAdapter::new());
    let workers = WorkerRuntime::with_webhook_secret(Arc::new(MemoryJobStore::new()), None, None, config.webhook_secret.clone()).with_worker(Arc::new(Double));
    let workflows = Arc::new(MapWorkflowRegistry::new().register(hook_config).register(agent_config));
    let dispatcher: Arc<dyn WorkerDispatcher> = Arc::new(workers.clone());
    let engine = Arc::new(Engine::new(router.clone(), adapter, dispatcher, workflows.clone()));

    let state = AppState::new(router, engine, workflows, workers, config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(trailhead_http::run_serve_on_listener(listener, state));
    tokio::task::yield_now().await;

    (format!("http://{addr}"), reqwest::Client::new())
}

#[tokio::test]
async fn agent_endpoint_returns_materialized_response() {
    let (base, client) = spawn_server().await;
    let resp = client
        .post(format!("{base}/agent/echo"))
        .json(&serde_json::json!({ "messages": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["data"][0][1], serde_json::json!("hi"));
}

#[tokio::test]
async fn chat_endpoint_streams_sse_parts() {
    let (base, client) = spawn_server().await;
    let resp = client.post(format!("{base}/chat")).json(&serde_json::json!({ "messages": [] })).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("\"type\":\"start\""), "body was: {body}");
}

#[tokio::test]
async fn worker_dispatch_and_poll_round_trip() {
    let (base, client) = spawn_server().await;
    let dispatched: serde_json::Value = client
        .post(format!("{base}/workers/double"))
        .json(&serde_json::json!({ "input": 21 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let job_id = dispatched["job_id"].as_str().unwrap().to_string();

    for _ in 0..50 {
        let job: serde_json::Value = client.get(format!("{base}/workers/jobs/{job_id}")).send().await.unwrap().json().await.unwrap();
        if job["status"] == "completed" {
            assert_eq!(job["output"], serde_json::json!(42));
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("job did not complete in time");
}

fn sign(secret: &str, body: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// `callback_handler` verifies `x-webhook-signature` against
/// `WEBHOOK_SECRET`: a callback signed with that same secret is accepted,
/// one signed with a different key (e.g. the remote-dispatch bearer key a
/// misconfigured runtime might reuse) is rejected with `401`.
#[tokio::test]
async fn callback_signature_is_checked_against_the_webhook_secret() {
    let config = TrailheadConfig { webhook_secret: Some("webhook-secret".into()), ..Default::default() };
    let (base, client) = spawn_server_with_config(config).await;

    let body = serde_json::json!({ "job_id": "job-1", "status": "completed", "output": 42 });
    let raw = serde_json::to_vec(&body).unwrap();

    let wrong = client
        .post(format!("{base}/workers/callback"))
        .header("x-webhook-signature", sign("some-other-key", &raw))
        .header("content-type", "application/json")
        .body(raw.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);

    let right = client
        .post(format!("{base}/workers/callback"))
        .header("x-webhook-signature", sign("webhook-secret", &raw))
        .header("content-type", "application/json")
        .body(raw)
        .send()
        .await
        .unwrap();
    assert_eq!(right.status(), 404, "unknown job_id still passes signature verification before the store lookup fails");
}

#[tokio::test]
async fn workflow_orchestrate_status_and_signal_round_trip() {
    let (base, client) = spawn_server().await;
    let started: serde_json::Value = client
        .post(format!("{base}/workflows/orchestrate"))
        .json(&serde_json::json!({ "workflow_id": "approval", "input": null }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let run_id = started["run_id"].as_str().unwrap().to_string();

    let mut paused = false;
    for _ in 0..50 {
        let status: serde_json::Value = client
            .get(format!("{base}/workflows/status"))
            .query(&[("run_id", run_id.as_str())])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if status["status"] == "paused" {
            paused = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(paused, "run never reached a paused hook");

    client
        .post(format!("{base}/workflows/signal"))
        .json(&serde_json::json!({ "run_id": run_id, "token": "approve-1", "payload": "approved" }))
        .send()
        .await
        .unwrap();

    for _ in 0..50 {
        let status: serde_json::Value = client
            .get(format!("{base}/workflows/status"))
            .query(&[("run_id", run_id.as_str())])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if status["status"] == "completed" {
            assert_eq!(status["result"], serde_json::json!("approved"));
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("run did not complete after signal");
}
