//! HTTP model client for OpenAI-compatible Chat Completions endpoints.
//!
//! Streams every request: text deltas are forwarded to the caller's event
//! sink as they arrive, and the complete response (text or tool calls) is
//! returned once the stream terminates.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::events::{ChatEvent, EventSink};
use crate::llm::streaming::ChatStreamAccumulator;
use crate::llm::types::{MessageRole, ModelMessage, ModelRequest, ModelResponse};

/// Default Chat Completions base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Request timeout covering the full streamed response.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The seam between the chat runtime and the hosted model.
///
/// Production uses [`HttpModelClient`]; tests use scripted implementations.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one generation step over the given request.
    ///
    /// Implementations emit [`ChatEvent::TextDelta`] events as text arrives
    /// and return the aggregated response when the step completes.
    async fn generate(&self, request: &ModelRequest, events: &EventSink) -> Result<ModelResponse>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to a model provider endpoint.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API (e.g. `https://api.openai.com/v1`).
    pub base_url: String,

    /// Default model identifier used when a request does not name one.
    pub default_model: String,

    /// Default maximum tokens per response.
    pub max_tokens: u32,
}

impl ModelConfig {
    /// Configuration for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            default_model: model.into(),
            max_tokens: 4096,
        }
    }

    /// Configuration for any OpenAI-compatible endpoint (e.g. Ollama, vLLM).
    pub fn compatible(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_model: model.into(),
            max_tokens: 4096,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A streaming client for OpenAI-compatible Chat Completions APIs.
#[derive(Debug, Clone)]
pub struct HttpModelClient {
    config: ModelConfig,
    http: reqwest::Client,
}

impl HttpModelClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::MissingApiKey`] if the key is empty.
    pub fn new(config: ModelConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(AgentError::MissingApiKey {
                provider: "openai".into(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AgentError::ModelRequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { config, http })
    }

    /// Build the JSON body for the Chat Completions endpoint.
    fn build_request_body(&self, request: &ModelRequest) -> Value {
        let model = if request.model.is_empty() {
            &self.config.default_model
        } else {
            &request.model
        };

        let mut body = json!({
            "model": model,
            "messages": messages_to_wire(&request.messages),
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "stream": true,
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }

        if !request.tools.is_empty() {
            body["tools"] = Value::Array(
                request
                    .tools
                    .iter()
                    .map(|t| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": t.name,
                                "description": t.description,
                                "parameters": t.input_schema,
                            }
                        })
                    })
                    .collect(),
            );
        }

        body
    }

    /// Consume the SSE response line by line, forwarding text deltas.
    async fn consume_stream(
        &self,
        resp: reqwest::Response,
        events: &EventSink,
    ) -> Result<ModelResponse> {
        let mut accumulator = ChatStreamAccumulator::new();
        let mut byte_stream = resp.bytes_stream();
        let mut line_buffer = String::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk.map_err(|e| AgentError::ModelStreamError {
                reason: format!("stream read error: {e}"),
            })?;
            let text = std::str::from_utf8(&chunk).map_err(|e| AgentError::ModelStreamError {
                reason: format!("invalid UTF-8 in stream: {e}"),
            })?;
            line_buffer.push_str(text);

            while let Some(newline) = line_buffer.find('\n') {
                let line = line_buffer[..newline].to_owned();
                line_buffer.drain(..=newline);

                if let Some(delta) = accumulator.feed_line(&line)? {
                    events.emit(ChatEvent::TextDelta { text: delta }).await;
                }
            }

            if accumulator.is_done() {
                break;
            }
        }

        accumulator.into_response()
    }
}

#[async_trait]
impl LanguageModel for HttpModelClient {
    async fn generate(&self, request: &ModelRequest, events: &EventSink) -> Result<ModelResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = self.build_request_body(request);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!(
            url = %url,
            model = %body["model"],
            message_count = request.messages.len(),
            tool_count = request.tools.len(),
            "sending model request"
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::ModelRequestFailed {
                reason: format!("API returned {status}: {text}"),
            });
        }

        self.consume_stream(resp, events).await
    }
}

// ---------------------------------------------------------------------------
// Wire rendering
// ---------------------------------------------------------------------------

/// Render messages into the Chat Completions wire shape.  Tool-call
/// arguments travel as serialized JSON strings under `function.arguments`.
fn messages_to_wire(messages: &[ModelMessage]) -> Value {
    Value::Array(
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                    MessageRole::Tool => "tool",
                };

                let mut message = json!({
                    "role": role,
                    "content": m.content,
                });

                if !m.tool_calls.is_empty() {
                    message["tool_calls"] = Value::Array(
                        m.tool_calls
                            .iter()
                            .map(|call| {
                                json!({
                                    "id": call.id,
                                    "type": "function",
                                    "function": {
                                        "name": call.name,
                                        "arguments": call.arguments.to_string(),
                                    }
                                })
                            })
                            .collect(),
                    );
                }

                if let Some(id) = &m.tool_call_id {
                    message["tool_call_id"] = json!(id);
                }

                message
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::types::ModelToolCall;
    use crate::tool::ToolSchema;

    fn client() -> HttpModelClient {
        HttpModelClient::new(ModelConfig::openai("test-key", "gpt-4o")).unwrap()
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result = HttpModelClient::new(ModelConfig::openai("", "gpt-4o"));
        assert!(matches!(result, Err(AgentError::MissingApiKey { .. })));
    }

    #[test]
    fn request_body_declares_tools_and_streams() {
        let request = ModelRequest {
            model: String::new(),
            messages: vec![ModelMessage::user("weather?")],
            tools: vec![ToolSchema {
                name: "get_weather_information".into(),
                description: "show the weather in a given city to the user".into(),
                input_schema: json!({"type": "object"}),
            }],
            temperature: Some(0.0),
            max_tokens: None,
        };

        let body = client().build_request_body(&request);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(
            body["tools"][0]["function"]["name"],
            "get_weather_information"
        );
    }

    #[test]
    fn wire_messages_carry_tool_calls_as_strings() {
        let messages = vec![
            ModelMessage::assistant(
                "",
                vec![ModelToolCall {
                    id: "call_1".into(),
                    name: "get_weather_information".into(),
                    arguments: json!({"city": "Paris"}),
                }],
            ),
            ModelMessage::tool_result("call_1", "sunny"),
        ];

        let wire = messages_to_wire(&messages);
        assert_eq!(wire[0]["role"], "assistant");
        let arguments = wire[0]["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(arguments).unwrap(),
            json!({"city": "Paris"})
        );
        assert_eq!(wire[1]["role"], "tool");
        assert_eq!(wire[1]["tool_call_id"], "call_1");
        assert_eq!(wire[1]["content"], "sunny");
    }
}
