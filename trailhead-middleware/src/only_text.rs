//! Only-text projection (spec §4.2: "Retains only text parts of each
//! message; for assistant messages, proportionally truncates across all
//! text parts so their combined length ≤ a configured cap. Exposes the
//! result via `state.onlyTextMessages` without mutating `request.messages`.").

use trailhead_core::{Message, MessageMetadata, Part, Role};
use trailhead_router::{middleware_fn, Middleware};

/// The `ctx.state` key the projected messages are exposed under.
pub const ONLY_TEXT_MESSAGES_KEY: &str = "onlyTextMessages";

/// Project each message in `ctx.request.messages` down to its text parts,
/// proportionally truncating assistant messages' combined text to `cap`
/// characters, and stash the projection in `ctx.state` under
/// [`ONLY_TEXT_MESSAGES_KEY`] without touching `ctx.request.messages`.
pub fn only_text_projection(cap: usize) -> impl Middleware {
    middleware_fn(move |ctx, next| {
        Box::pin(async move {
            let projected: Vec<Message> = ctx
                .request
                .messages
                .iter()
                .map(|message| project_message(message, cap))
                .collect();
            ctx.state.insert(ONLY_TEXT_MESSAGES_KEY, projected);
            next.run(ctx).await
        })
    })
}

fn project_message(message: &Message, cap: usize) -> Message {
    let text_parts: Vec<(usize, &str)> = message
        .parts
        .iter()
        .enumerate()
        .filter_map(|(i, part)| match part {
            Part::Text { delta, .. } => Some((i, delta.as_str())),
            _ => None,
        })
        .collect();

    let total_len: usize = text_parts.iter().map(|(_, s)| s.len()).sum();
    let truncate = matches!(message.role, Role::Assistant) && total_len > cap && cap > 0;

    let mut parts = Vec::with_capacity(text_parts.len());
    let mut budget = cap;
    for (_, delta) in &text_parts {
        let kept = if truncate {
            let share = if total_len == 0 {
                0
            } else {
                (delta.len() * cap) / total_len
            };
            share.min(budget)
        } else {
            delta.len()
        };
        let truncated = take_chars_up_to_byte_len(delta, kept);
        budget = budget.saturating_sub(truncated.len());
        parts.push(Part::Text {
            message_id: message.id,
            delta: truncated,
        });
    }

    Message {
        id: message.id,
        role: message.role,
        parts,
        metadata: MessageMetadata::default(),
    }
}

/// Truncate `s` to at most `max_bytes`, backing off to the nearest char
/// boundary so multi-byte UTF-8 sequences never get split.
fn take_chars_up_to_byte_len(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
