//! [`ResponseWriter`] / [`ResponseStream`] — the producer/consumer halves of
//! a response stream (spec §3 Response/Stream, §9 "stream as a channel with
//! a finalizer").

use tokio::sync::mpsc;
use trailhead_core::{Part, ToolState};
use uuid::Uuid;

/// The write half of a response stream. Cloning a writer gives every clone
/// a handle to the same underlying channel, so a handler and any
/// `callAgent`-spawned sub-tasks can all write concurrently; ordering
/// between independent writers is FIFO by send time (spec §5).
#[derive(Clone)]
pub struct ResponseWriter {
    tx: mpsc::Sender<Part>,
}

/// The read half. Consumed incrementally by `handle`'s caller, or drained
/// in full by [`crate::materialize`].
pub struct ResponseStream {
    rx: mpsc::Receiver<Part>,
}

/// Create a linked writer/stream pair. `capacity` bounds how many parts may
/// be buffered before a writer's `write` call awaits — this is the
/// handler-local backpressure spec §5 describes.
pub fn channel(capacity: usize) -> (ResponseWriter, ResponseStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (ResponseWriter { tx }, ResponseStream { rx })
}

impl ResponseWriter {
    /// Write a single part, awaiting if the channel is full.
    pub async fn write(&self, part: Part) {
        // The receiver may have been dropped (caller cancelled); a failed
        // send is not an error the handler needs to see, it just means
        // nothing downstream is listening anymore.
        let _ = self.tx.send(part).await;
    }

    /// Emit the `start` sentinel for `message_id`.
    pub async fn start(&self, message_id: Uuid) {
        self.write(Part::Start { message_id }).await;
    }

    /// Emit the `finish` sentinel for `message_id`.
    pub async fn finish(&self, message_id: Uuid) {
        self.write(Part::Finish { message_id }).await;
    }

    /// Emit a text delta.
    pub async fn text(&self, message_id: Uuid, delta: impl Into<String>) {
        self.write(Part::Text {
            message_id,
            delta: delta.into(),
        })
        .await;
    }

    /// Emit a terminal error part (spec §7: "clients always observe a
    /// terminating event").
    pub async fn error(&self, message_id: Uuid, message: impl Into<String>, stack: Option<String>) {
        self.write(Part::Error {
            message_id,
            message: message.into(),
            stack,
        })
        .await;
    }

    /// Emit a tool-call lifecycle part.
    #[allow(clippy::too_many_arguments)]
    pub async fn tool(
        &self,
        message_id: Uuid,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        state: ToolState,
        input: Option<serde_json::Value>,
        output: Option<serde_json::Value>,
        error: Option<String>,
    ) {
        self.write(Part::Tool {
            message_id,
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            state,
            input,
            output,
            error,
        })
        .await;
    }

    /// Emit a UI-bearing tool result.
    pub async fn tool_ui(&self, message_id: Uuid, name: impl Into<String>, payload: serde_json::Value) {
        self.write(Part::ToolUi {
            message_id,
            name: name.into(),
            payload,
        })
        .await;
    }

    /// Emit a structured data payload.
    pub async fn data(&self, message_id: Uuid, name: impl Into<String>, payload: serde_json::Value) {
        self.write(Part::Data {
            message_id,
            name: name.into(),
            payload,
        })
        .await;
    }

    /// Merge fields into the enclosing message's metadata — used for a
    /// live `loader` string (spec §4.2 chat-session restore middleware).
    pub async fn write_message_metadata(&self, message_id: Uuid, fields: serde_json::Value) {
        self.write(Part::MessageMetadata { message_id, fields }).await;
    }

    /// True once the receiving end has been dropped — callers may use this
    /// to stop doing expensive work on a cancelled stream (spec §5
    /// cancellation).
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl ResponseStream {
    /// Pull the next part, or `None` once the writer side is dropped *and*
    /// drained.
    pub async fn next_part(&mut self) -> Option<Part> {
        self.rx.recv().await
    }

    /// Drain every remaining part into a `Vec`, preserving emission order.
    pub async fn collect(mut self) -> Vec<Part> {
        let mut parts = Vec::new();
        while let Some(part) = self.next_part().await {
            parts.push(part);
        }
        parts
    }
}

/// Merge `sources` into `into`, preserving each source's internal order.
/// Interleaving between sources is FIFO by emission time (spec §4.1
/// `callAgent(..., { streamToUI: true })`, §5 ordering guarantees).
///
/// Spawns one forwarding task per source and returns immediately; the
/// caller does not need to await completion unless it wants to block until
/// every source has drained.
pub fn merge_into(into: ResponseWriter, mut sources: Vec<ResponseStream>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut handles = Vec::with_capacity(sources.len());
        for mut source in sources.drain(..) {
            let writer = into.clone();
            handles.push(tokio::spawn(async move {
                while let Some(part) = source.next_part().await {
                    writer.write(part).await;
                }
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_collect_preserves_order() {
        let (w, r) = channel(8);
        let id = Uuid::new_v4();
        w.start(id).await;
        w.text(id, "a").await;
        w.text(id, "b").await;
        w.finish(id).await;
        drop(w);
        let parts = r.collect().await;
        assert_eq!(parts.len(), 4);
        assert!(matches!(parts[0], Part::Start { .. }));
        assert!(matches!(&parts[1], Part::Text { delta, .. } if delta == "a"));
        assert!(matches!(&parts[2], Part::Text { delta, .. } if delta == "b"));
        assert!(matches!(parts[3], Part::Finish { .. }));
    }

    #[tokio::test]
    async fn merge_preserves_each_sources_internal_order() {
        let (outer_w, outer_r) = channel(32);
        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();

        let (a_w, a_r) = channel(8);
        let (b_w, b_r) = channel(8);
        a_w.text(id_a, "a1").await;
        a_w.text(id_a, "a2").await;
        drop(a_w);
        b_w.text(id_b, "b1").await;
        b_w.text(id_b, "b2").await;
        drop(b_w);

        let handle = merge_into(outer_w.clone(), vec![a_r, b_r]);
        drop(outer_w);
        handle.await.unwrap();

        let parts = outer_r.collect().await;
        let a_deltas: Vec<&str> = parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { message_id, delta } if *message_id == id_a => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        let b_deltas: Vec<&str> = parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { message_id, delta } if *message_id == id_b => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(a_deltas, vec!["a1", "a2"]);
        assert_eq!(b_deltas, vec!["b1", "b2"]);
    }

    #[tokio::test]
    async fn is_closed_reflects_dropped_receiver() {
        let (w, r) = channel(1);
        assert!(!w.is_closed());
        drop(r);
        // give the runtime a tick to propagate the drop
        tokio::task::yield_now().await;
        assert!(w.is_closed());
    }
}
