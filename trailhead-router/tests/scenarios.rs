//! Integration tests covering the router's basic dispatch, middleware
//! short-circuiting, and sub-agent call semantics (spec §8 Scenarios A, B).

use std::sync::Arc;
use trailhead_core::{Request, TrailheadError};
use trailhead_router::{agent_fn, middleware_fn, CallOptions, Context, RouterBuilder};

#[tokio::test]
async fn basic_routing_streams_text_then_finishes() {
    let router = RouterBuilder::new()
        .agent(
            "/echo",
            Arc::new(agent_fn(|ctx: &mut Context| {
                Box::pin(async move {
                    ctx.response.text(uuid::Uuid::new_v4(), "hello").await;
                    Ok(None)
                })
            })),
        )
        .unwrap()
        .build()
        .unwrap();

    let response = router.to_await_response("/echo", Request::new("/echo")).await;
    assert_eq!(response.text, "hello");
    assert!(!response.is_error());
}

#[tokio::test]
async fn not_found_path_surfaces_as_terminal_error() {
    let router = RouterBuilder::new().build().unwrap();
    let response = router.to_await_response("/missing", Request::new("/missing")).await;
    assert!(response.is_error());
    assert_eq!(response.error.unwrap().name.as_deref(), Some("NotFound"));
}

#[tokio::test]
async fn middleware_short_circuits_without_calling_next() {
    let gate = middleware_fn(|ctx, _next| {
        Box::pin(async move {
            ctx.response.text(uuid::Uuid::new_v4(), "blocked").await;
            Ok(None)
        })
    });

    let router = RouterBuilder::new()
        .use_mw("/guarded", Arc::new(gate))
        .agent(
            "/guarded",
            Arc::new(agent_fn(|ctx: &mut Context| {
                Box::pin(async move {
                    ctx.response.text(uuid::Uuid::new_v4(), "never runs").await;
                    Ok(None)
                })
            })),
        )
        .unwrap()
        .build()
        .unwrap();

    let response = router.to_await_response("/guarded", Request::new("/guarded")).await;
    assert_eq!(response.text, "blocked");
}

#[tokio::test]
async fn middleware_can_observe_and_forward_to_next() {
    let logging = middleware_fn(|ctx, next| {
        Box::pin(async move {
            ctx.state.insert("seen", true);
            next.run(ctx).await
        })
    });

    let router = RouterBuilder::new()
        .use_mw("/logged", Arc::new(logging))
        .agent(
            "/logged",
            Arc::new(agent_fn(|ctx: &mut Context| {
                Box::pin(async move {
                    let seen: bool = ctx.state.get("seen").unwrap_or(false);
                    ctx.response.text(uuid::Uuid::new_v4(), if seen { "seen" } else { "missed" }).await;
                    Ok(None)
                })
            })),
        )
        .unwrap()
        .build()
        .unwrap();

    let response = router.to_await_response("/logged", Request::new("/logged")).await;
    assert_eq!(response.text, "seen");
}

#[tokio::test]
async fn duplicate_route_registration_fails() {
    let handler = Arc::new(agent_fn(|_ctx: &mut Context| Box::pin(async move { Ok(None) })));
    let other = Arc::new(agent_fn(|_ctx: &mut Context| Box::pin(async move { Ok(None) })));

    let builder = RouterBuilder::new().agent("/a", handler.clone()).unwrap();
    assert!(matches!(
        builder.agent("/a", other).unwrap_err(),
        TrailheadError::DuplicateRoute(_)
    ));
}

#[tokio::test]
async fn handler_return_value_is_surfaced_as_return_data_part() {
    let router = RouterBuilder::new()
        .agent(
            "/compute",
            Arc::new(agent_fn(|_ctx: &mut Context| {
                Box::pin(async move { Ok(Some(serde_json::json!({"answer": 42}))) })
            })),
        )
        .unwrap()
        .build()
        .unwrap();

    let response = router.to_await_response("/compute", Request::new("/compute")).await;
    let (name, payload) = response.data.first().expect("one data part");
    assert_eq!(name, trailhead_router::RETURN_DATA_NAME);
    assert_eq!(payload, &serde_json::json!({"answer": 42}));
}

#[tokio::test]
async fn call_agent_returns_sub_agents_result_without_forwarding_by_default() {
    let router = RouterBuilder::new()
        .agent(
            "/inner",
            Arc::new(agent_fn(|ctx: &mut Context| {
                Box::pin(async move {
                    ctx.response.text(uuid::Uuid::new_v4(), "inner text").await;
                    Ok(Some(serde_json::json!("inner-data")))
                })
            })),
        )
        .unwrap()
        .agent(
            "/outer",
            Arc::new(agent_fn(|ctx: &mut Context| {
                Box::pin(async move {
                    let result = ctx
                        .call_agent("/inner", trailhead_core::Bag::new(), CallOptions::isolated())
                        .await;
                    assert!(result.ok);
                    assert_eq!(result.data, Some(serde_json::json!("inner-data")));
                    Ok(None)
                })
            })),
        )
        .unwrap()
        .build()
        .unwrap();

    let response = router.to_await_response("/outer", Request::new("/outer")).await;
    assert!(!response.is_error());
    assert!(response.text.is_empty(), "isolated call must not leak into the caller's stream");
}

#[tokio::test]
async fn call_agent_with_stream_to_ui_forwards_parts_into_caller() {
    let router = RouterBuilder::new()
        .agent(
            "/inner",
            Arc::new(agent_fn(|ctx: &mut Context| {
                Box::pin(async move {
                    ctx.response.text(uuid::Uuid::new_v4(), "inner text").await;
                    Ok(None)
                })
            })),
        )
        .unwrap()
        .agent(
            "/outer",
            Arc::new(agent_fn(|ctx: &mut Context| {
                Box::pin(async move {
                    let _ = ctx
                        .call_agent("/inner", trailhead_core::Bag::new(), CallOptions::stream_to_ui())
                        .await;
                    Ok(None)
                })
            })),
        )
        .unwrap()
        .build()
        .unwrap();

    let response = router.to_await_response("/outer", Request::new("/outer")).await;
    assert_eq!(response.text, "inner text");
}

#[tokio::test]
async fn mount_reparents_subrouter_tools_under_mount_path() {
    let sub = RouterBuilder::new()
        .agent(
            "/search",
            Arc::new(agent_fn(|_ctx: &mut Context| Box::pin(async move { Ok(None) }))),
        )
        .unwrap()
        .act_as_tool(
            "/search",
            trailhead_core::ToolDescriptor::new(
                "search",
                "search",
                "search the web",
                serde_json::json!({"type": "object"}),
                trailhead_core::Path::new("/search"),
            ),
        )
        .unwrap();

    let router = RouterBuilder::new().mount("/research", sub).unwrap().build().unwrap();

    let tools = &router.registry().tools;
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].absolute_path.as_str(), "/research/search");
    assert_eq!(tools[0].tool_key, "research_search");

    let response = router
        .to_await_response("/research/search", Request::new("/research/search"))
        .await;
    assert!(!response.is_error());
}

#[tokio::test]
async fn duplicate_tool_id_across_distinct_paths_fails_at_build() {
    let first = trailhead_core::ToolDescriptor::new(
        "dup",
        "a",
        "a",
        serde_json::json!({}),
        trailhead_core::Path::new("/a"),
    );
    let second = trailhead_core::ToolDescriptor::new(
        "dup",
        "b",
        "b",
        serde_json::json!({}),
        trailhead_core::Path::new("/b"),
    );

    let err = RouterBuilder::new()
        .act_as_tool("/a", first)
        .unwrap()
        .act_as_tool("/b", second)
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, TrailheadError::DuplicateToolId(_)));
}

#[tokio::test]
async fn duplicate_tool_at_same_path_fails_immediately() {
    let first = trailhead_core::ToolDescriptor::new(
        "a",
        "a",
        "a",
        serde_json::json!({}),
        trailhead_core::Path::new("/x"),
    );
    let second = trailhead_core::ToolDescriptor::new(
        "b",
        "b",
        "b",
        serde_json::json!({}),
        trailhead_core::Path::new("/x"),
    );

    let err = RouterBuilder::new()
        .act_as_tool("/x", first)
        .unwrap()
        .act_as_tool("/x", second)
        .unwrap_err();
    assert!(matches!(err, TrailheadError::DuplicateToolId(_)));
}
