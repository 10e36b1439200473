//! Streamed chat events.
//!
//! As a conversation progresses the runtime emits a sequence of typed events
//! — text chunks, new tool-call parts, resolved tool results — that a client
//! renders incrementally.  Events are fire-and-forget: a listener that has
//! gone away must not stall the run.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::runtime::RunStatus;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A single update in the outbound chat stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChatEvent {
    /// An incremental chunk of assistant text.
    TextDelta { text: String },

    /// The model requested a tool call; its input is now available.
    #[serde(rename_all = "camelCase")]
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },

    /// A tool call was resolved (executed, auto-executed, or denied).
    #[serde(rename_all = "camelCase")]
    ToolOutputAvailable { tool_call_id: String, output: Value },

    /// The run ended; the conversation is persisted.
    #[serde(rename_all = "camelCase")]
    Finish {
        conversation_id: String,
        status: RunStatus,
        steps: u32,
    },

    /// The run failed.
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Event sink
// ---------------------------------------------------------------------------

/// Handle for emitting [`ChatEvent`]s to a live listener.
///
/// Wraps an optional channel sender; [`EventSink::disabled`] produces a sink
/// that drops everything, which non-streaming callers and tests use.
#[derive(Clone)]
pub struct EventSink {
    tx: Option<mpsc::Sender<ChatEvent>>,
}

impl EventSink {
    /// Create a sink that forwards events into `tx`.
    pub fn new(tx: mpsc::Sender<ChatEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Create a sink that discards all events.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Emit an event.  A closed or absent channel is not an error — the
    /// listener may have disconnected mid-run.
    pub async fn emit(&self, event: ChatEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                tracing::debug!("chat event dropped: listener disconnected");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_wire_format() {
        let event = ChatEvent::ToolOutputAvailable {
            tool_call_id: "call_1".into(),
            output: json!("sunny"),
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["type"], "tool-output-available");
        assert_eq!(v["toolCallId"], "call_1");
        assert_eq!(v["output"], "sunny");

        let delta = serde_json::to_value(ChatEvent::TextDelta { text: "hi".into() }).unwrap();
        assert_eq!(delta["type"], "text-delta");
    }

    #[tokio::test]
    async fn sink_forwards_events() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = EventSink::new(tx);
        sink.emit(ChatEvent::TextDelta { text: "a".into() }).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received, ChatEvent::TextDelta { text: "a".into() });
    }

    #[tokio::test]
    async fn disabled_sink_and_closed_channel_do_not_error() {
        EventSink::disabled()
            .emit(ChatEvent::TextDelta { text: "a".into() })
            .await;

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        EventSink::new(tx)
            .emit(ChatEvent::TextDelta { text: "b".into() })
            .await;
    }
}
