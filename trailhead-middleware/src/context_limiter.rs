//! Context limiter (spec §4.2: "Truncates `request.messages` to the last N
//! elements. If fewer than N, passes through.").

use trailhead_router::{middleware_fn, Middleware};

/// Build a middleware that truncates `ctx.request.messages` to its last
/// `max_messages` elements before calling `next`.
pub fn context_limiter(max_messages: usize) -> impl Middleware {
    middleware_fn(move |ctx, next| {
        Box::pin(async move {
            let len = ctx.request.messages.len();
            if len > max_messages {
                ctx.request.messages.drain(..len - max_messages);
            }
            next.run(ctx).await
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trailhead_core::{Message, Request, Role};
    use trailhead_router::{agent_fn, Context, RouterBuilder};

    #[tokio::test]
    async fn truncates_to_the_last_n_messages() {
        let router = RouterBuilder::new()
            .use_mw("/chat", Arc::new(context_limiter(2)))
            .agent(
                "/chat",
                Arc::new(agent_fn(|ctx: &mut Context| {
                    Box::pin(async move {
                        let texts: Vec<String> = ctx.request.messages.iter().map(Message::text).collect();
                        ctx.response
                            .text(uuid::Uuid::new_v4(), texts.join(","))
                            .await;
                        Ok(None)
                    })
                })),
            )
            .unwrap()
            .build()
            .unwrap();

        let mut request = Request::new("/chat");
        for text in ["a", "b", "c"] {
            let mut msg = Message::new(Role::User);
            msg.parts.push(trailhead_core::Part::Text {
                message_id: msg.id,
                delta: text.to_string(),
            });
            request.messages.push(msg);
        }

        let response = router.to_await_response("/chat", request).await;
        assert_eq!(response.text, "b,c");
    }

    #[tokio::test]
    async fn passes_through_when_fewer_than_n() {
        let router = RouterBuilder::new()
            .use_mw("/chat", Arc::new(context_limiter(5)))
            .agent(
                "/chat",
                Arc::new(agent_fn(|ctx: &mut Context| {
                    let count = ctx.request.messages.len();
                    Box::pin(async move {
                        ctx.response.text(uuid::Uuid::new_v4(), count.to_string()).await;
                        Ok(None)
                    })
                })),
            )
            .unwrap()
            .build()
            .unwrap();

        let request = Request::with_messages("/chat", vec![Message::user_text("hi")]);
        let response = router.to_await_response("/chat", request).await;
        assert_eq!(response.text, "1");
    }
}
