//! SSE stream parser for the Chat Completions streaming format.
//!
//! The provider sends `data:` lines with JSON payloads containing
//! `choices[].delta` objects and terminates the stream with a `data: [DONE]`
//! sentinel.  Text arrives as content deltas; tool calls arrive fragmented —
//! the call id and function name in an early chunk, argument JSON spread
//! across subsequent chunks — and must be reassembled before parsing.

use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::llm::types::{ModelResponse, ModelToolCall};

/// Accumulates fragments from a model SSE stream into a complete response.
#[derive(Debug, Default)]
pub struct ChatStreamAccumulator {
    /// Accumulated text from `choices[].delta.content`.
    text: String,

    /// In-progress tool calls, indexed by their position in the stream's
    /// `tool_calls` array.
    partial_calls: Vec<PartialToolCall>,

    /// Whether the `[DONE]` sentinel has been received.
    done: bool,
}

/// A tool call being assembled from streaming deltas.
#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl ChatStreamAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the stream terminator has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one line from the SSE stream.
    ///
    /// Returns `Ok(Some(delta))` when the line carried a text content delta
    /// (for incremental rendering), `Ok(None)` otherwise.
    pub fn feed_line(&mut self, line: &str) -> Result<Option<String>> {
        let line = line.trim_end();

        // Blank lines, SSE comments, and non-data fields carry no payload.
        if line.is_empty() || line.starts_with(':') {
            return Ok(None);
        }
        let Some(data) = line.strip_prefix("data: ") else {
            return Ok(None);
        };
        let data = data.trim();

        if data == "[DONE]" {
            self.done = true;
            return Ok(None);
        }

        let payload: Value =
            serde_json::from_str(data).map_err(|e| AgentError::ModelParseFailed {
                reason: format!("invalid JSON in SSE data: {e}"),
            })?;

        let delta = &payload["choices"][0]["delta"];
        if delta.is_null() {
            return Ok(None);
        }

        let mut text_delta = None;
        if let Some(content) = delta["content"].as_str() {
            self.text.push_str(content);
            text_delta = Some(content.to_owned());
        }

        if let Some(calls) = delta["tool_calls"].as_array() {
            for fragment in calls {
                let index = fragment["index"].as_u64().unwrap_or(0) as usize;
                while self.partial_calls.len() <= index {
                    self.partial_calls.push(PartialToolCall::default());
                }

                let partial = &mut self.partial_calls[index];
                if let Some(id) = fragment["id"].as_str() {
                    partial.id = id.to_owned();
                }
                let function = &fragment["function"];
                if let Some(name) = function["name"].as_str() {
                    partial.name.push_str(name);
                }
                if let Some(arguments) = function["arguments"].as_str() {
                    partial.arguments.push_str(arguments);
                }
            }
        }

        Ok(text_delta)
    }

    /// Consume the accumulator and produce the final response.
    ///
    /// Tool calls take priority over text content, matching non-streaming
    /// provider behavior.
    pub fn into_response(self) -> Result<ModelResponse> {
        if self.partial_calls.is_empty() {
            return Ok(ModelResponse::Text(self.text));
        }

        let calls = self
            .partial_calls
            .into_iter()
            .map(|partial| {
                let arguments: Value = if partial.arguments.is_empty() {
                    Value::Object(Default::default())
                } else {
                    serde_json::from_str(&partial.arguments).map_err(|e| {
                        AgentError::ModelParseFailed {
                            reason: format!(
                                "invalid JSON in tool call `{}` arguments: {e}",
                                partial.name
                            ),
                        }
                    })?
                };

                Ok(ModelToolCall {
                    id: partial.id,
                    name: partial.name,
                    arguments,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ModelResponse::ToolCalls(calls))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_deltas_accumulate() {
        let mut acc = ChatStreamAccumulator::new();

        let first = acc
            .feed_line(r#"data: {"choices":[{"index":0,"delta":{"content":"It is "}}]}"#)
            .unwrap();
        assert_eq!(first.as_deref(), Some("It is "));

        let second = acc
            .feed_line(r#"data: {"choices":[{"index":0,"delta":{"content":"sunny."}}]}"#)
            .unwrap();
        assert_eq!(second.as_deref(), Some("sunny."));

        acc.feed_line("data: [DONE]").unwrap();
        assert!(acc.is_done());
        assert_eq!(
            acc.into_response().unwrap(),
            ModelResponse::Text("It is sunny.".into())
        );
    }

    #[test]
    fn fragmented_tool_call_reassembles() {
        let mut acc = ChatStreamAccumulator::new();

        acc.feed_line(
            r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"get_weather_information","arguments":""}}]}}]}"#,
        )
        .unwrap();
        acc.feed_line(
            r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"city\":"}}]}}]}"#,
        )
        .unwrap();
        acc.feed_line(
            r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"Paris\"}"}}]}}]}"#,
        )
        .unwrap();
        acc.feed_line("data: [DONE]").unwrap();

        match acc.into_response().unwrap() {
            ModelResponse::ToolCalls(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].id, "call_1");
                assert_eq!(calls[0].name, "get_weather_information");
                assert_eq!(calls[0].arguments["city"], "Paris");
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[test]
    fn parallel_tool_calls_by_index() {
        let mut acc = ChatStreamAccumulator::new();

        acc.feed_line(
            r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"a","arguments":"{}"}}]}}]}"#,
        )
        .unwrap();
        acc.feed_line(
            r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":1,"id":"call_2","function":{"name":"b","arguments":"{}"}}]}}]}"#,
        )
        .unwrap();

        match acc.into_response().unwrap() {
            ModelResponse::ToolCalls(calls) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].name, "a");
                assert_eq!(calls[1].name, "b");
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[test]
    fn noise_lines_are_ignored() {
        let mut acc = ChatStreamAccumulator::new();
        assert!(acc.feed_line("").unwrap().is_none());
        assert!(acc.feed_line(": keepalive").unwrap().is_none());
        assert!(acc.feed_line("event: message").unwrap().is_none());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let mut acc = ChatStreamAccumulator::new();
        assert!(acc.feed_line("data: {not json}").is_err());
    }

    #[test]
    fn empty_stream_yields_empty_text() {
        let acc = ChatStreamAccumulator::new();
        assert_eq!(acc.into_response().unwrap(), ModelResponse::Text(String::new()));
    }

    #[test]
    fn malformed_arguments_fail_at_finalization() {
        let mut acc = ChatStreamAccumulator::new();
        acc.feed_line(
            r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"t","arguments":"{\"city\":"}}]}}]}"#,
        )
        .unwrap();
        assert!(acc.into_response().is_err());
    }
}
