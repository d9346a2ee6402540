//! [`agent_as_tool`] and [`CallableTool`] — exposing a routed agent subtree
//! as callable tools (spec §4.3).

use crate::schema::validate;
use trailhead_core::{Bag, Path, ToolDescriptor, ToolState};
use trailhead_router::{CallOptions, Context, Router};
use uuid::Uuid;

/// A single tool derived from a [`ToolDescriptor`], bound to the [`Router`]
/// that can dispatch it.
#[derive(Clone)]
pub struct CallableTool {
    descriptor: ToolDescriptor,
    router: Router,
}

/// Every tool whose `absolute_path` is `sub_path` or a descendant of it
/// (spec §4.3: "`agentAsTool(subPath)` yields exactly the tools whose
/// absolute path starts with `subPath`").
pub fn agent_as_tool(router: &Router, sub_path: impl Into<Path>) -> Vec<CallableTool> {
    let sub_path = sub_path.into();
    router
        .registry()
        .under(&sub_path)
        .into_iter()
        .map(|descriptor| CallableTool {
            descriptor: descriptor.clone(),
            router: router.clone(),
        })
        .collect()
}

fn bag_from_object(input: &serde_json::Value) -> Bag {
    let mut bag = Bag::new();
    if let serde_json::Value::Object(map) = input {
        for (key, value) in map {
            bag.insert(key.clone(), value.clone());
        }
    }
    bag
}

impl CallableTool {
    /// The descriptor this tool was derived from.
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Run this tool from within a handler invocation (spec §4.3 `execute`):
    /// validate `input`, invoke the underlying agent with
    /// `{ streamToUI: true }` so its stream merges into `ctx.response`,
    /// await its terminal result, validate against the output schema if
    /// one is declared, and write the lifecycle as a `tool-<name>` part on
    /// `ctx.response`. Returns the agent's returned value, or `None` on
    /// failure (the failure itself is visible on the stream as a
    /// `ToolState::Error` part, per the stream-always-terminates contract).
    pub async fn execute(
        &self,
        ctx: &mut Context,
        message_id: Uuid,
        tool_call_id: impl Into<String>,
        input: serde_json::Value,
    ) -> Option<serde_json::Value> {
        let tool_call_id = tool_call_id.into();

        if let Err(err) = validate(&self.descriptor.id, &self.descriptor.input_schema, &input) {
            ctx.response
                .tool(
                    message_id,
                    tool_call_id,
                    self.descriptor.name.clone(),
                    ToolState::Error,
                    Some(input),
                    None,
                    Some(err.to_string()),
                )
                .await;
            return None;
        }

        let params = bag_from_object(&input);
        let result = ctx
            .call_agent(self.descriptor.absolute_path.clone(), params, CallOptions::stream_to_ui())
            .await;

        if !result.ok {
            let message = result
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "tool invocation failed".to_string());
            ctx.response
                .tool(
                    message_id,
                    tool_call_id,
                    self.descriptor.name.clone(),
                    ToolState::Error,
                    Some(input),
                    None,
                    Some(message),
                )
                .await;
            return None;
        }

        if let (Some(schema), Some(output)) = (&self.descriptor.output_schema, &result.data) {
            if let Err(err) = validate(&self.descriptor.id, schema, output) {
                ctx.response
                    .tool(
                        message_id,
                        tool_call_id,
                        self.descriptor.name.clone(),
                        ToolState::Error,
                        Some(input),
                        None,
                        Some(err.to_string()),
                    )
                    .await;
                return None;
            }
        }

        ctx.response
            .tool(
                message_id,
                tool_call_id,
                self.descriptor.name.clone(),
                ToolState::OutputAvailable,
                Some(input),
                result.data.clone(),
                None,
            )
            .await;

        result.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trailhead_core::Request;
    use trailhead_router::{agent_fn, RouterBuilder};

    fn sum_tool_descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "sum",
            "sum",
            "adds two numbers",
            serde_json::json!({
                "type": "object",
                "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                "required": ["a", "b"],
            }),
            Path::new("/math/sum"),
        )
        .with_output_schema(serde_json::json!({"type": "object", "required": ["result"]}))
    }

    fn build_router() -> Router {
        RouterBuilder::new()
            .agent(
                "/math/sum",
                Arc::new(agent_fn(|ctx: &mut Context| {
                    Box::pin(async move {
                        let a: f64 = ctx.request.params.get("a").unwrap_or(0.0);
                        let b: f64 = ctx.request.params.get("b").unwrap_or(0.0);
                        Ok(Some(serde_json::json!({"result": a + b})))
                    })
                })),
            )
            .unwrap()
            .act_as_tool("/math/sum", sum_tool_descriptor())
            .unwrap()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn agent_as_tool_lists_tools_under_sub_path() {
        let router = build_router();
        let tools = agent_as_tool(&router, "/math");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].descriptor().tool_key, "math_sum");
    }

    #[tokio::test]
    async fn execute_validates_input_calls_agent_and_surfaces_output() {
        let router = build_router();
        let tool = agent_as_tool(&router, "/math").remove(0);

        let caller_router = RouterBuilder::new()
            .agent(
                "/caller",
                Arc::new(agent_fn(move |ctx: &mut Context| {
                    let tool = tool.clone();
                    Box::pin(async move {
                        let output = tool
                            .execute(ctx, Uuid::new_v4(), "call-1", serde_json::json!({"a": 2, "b": 3}))
                            .await;
                        assert_eq!(output, Some(serde_json::json!({"result": 5.0})));
                        Ok(None)
                    })
                })),
            )
            .unwrap()
            .build()
            .unwrap();

        let response = caller_router.to_await_response("/caller", Request::new("/caller")).await;
        assert!(!response.is_error());
        let call = response
            .tool_calls
            .iter()
            .find(|c| c.tool_call_id == "call-1")
            .expect("tool call recorded");
        assert_eq!(call.state, ToolState::OutputAvailable);
        assert_eq!(call.output, Some(serde_json::json!({"result": 5.0})));
    }

    #[tokio::test]
    async fn execute_rejects_invalid_input_without_calling_agent() {
        let router = build_router();
        let tool = agent_as_tool(&router, "/math").remove(0);

        let caller_router = RouterBuilder::new()
            .agent(
                "/caller",
                Arc::new(agent_fn(move |ctx: &mut Context| {
                    let tool = tool.clone();
                    Box::pin(async move {
                        let output = tool.execute(ctx, Uuid::new_v4(), "call-2", serde_json::json!({"a": 2})).await;
                        assert!(output.is_none());
                        Ok(None)
                    })
                })),
            )
            .unwrap()
            .build()
            .unwrap();

        let response = caller_router.to_await_response("/caller", Request::new("/caller")).await;
        let call = response
            .tool_calls
            .iter()
            .find(|c| c.tool_call_id == "call-2")
            .expect("tool call recorded");
        assert_eq!(call.state, ToolState::Error);
    }
}
