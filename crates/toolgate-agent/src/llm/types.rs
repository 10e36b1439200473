//! Wire types for model requests.
//!
//! These types model the data flowing between the chat runtime and the model
//! provider.  They are provider-agnostic at this layer; [`super::client`]
//! translates them into the provider's wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::{Conversation, Part, Role, ToolCallState};
use crate::tool::ToolSchema;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// The role of a wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System-level instructions that shape model behavior.
    System,
    /// Input from the human user.
    User,
    /// Output from the model.
    Assistant,
    /// Result of a tool invocation, fed back to the model.
    Tool,
}

/// A single message in the request the model receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMessage {
    /// Who produced this message.
    pub role: MessageRole,

    /// Textual content.  Empty for assistant messages that only carry tool
    /// calls.
    #[serde(default)]
    pub content: String,

    /// Tool calls requested by the assistant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ModelToolCall>,

    /// The call this message answers (only for `MessageRole::Tool`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ModelMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create an assistant message carrying text and/or tool calls.
    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ModelToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool calls
// ---------------------------------------------------------------------------

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelToolCall {
    /// Identifier assigned by the model for correlating results.
    pub id: String,

    /// The name of the tool to invoke.
    pub name: String,

    /// Arguments as a JSON value matching the tool's schema.
    pub arguments: Value,
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// A full request to send to the model provider.
#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    /// The model identifier (e.g. `"gpt-4o"`).
    pub model: String,

    /// The conversation rendered as wire messages.
    pub messages: Vec<ModelMessage>,

    /// Tool declarations the model may invoke.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens the model may generate in this turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// The high-level model response for one generation step.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// The model produced a text answer.
    Text(String),

    /// The model wants one or more tools invoked before continuing.
    ToolCalls(Vec<ModelToolCall>),
}

// ---------------------------------------------------------------------------
// Conversation -> wire conversion
// ---------------------------------------------------------------------------

/// Render a conversation as the flat message list the model consumes.
///
/// Text parts become message content.  A resolved tool-call part expands into
/// the assistant's `tool_calls` entry plus a follow-up tool message carrying
/// the output.  Pending calls never reach the model — the runtime resolves
/// every call of the latest turn before re-entry — so they are skipped here.
pub fn to_model_messages(
    conversation: &Conversation,
    system_prompt: Option<&str>,
) -> Vec<ModelMessage> {
    let mut messages = Vec::with_capacity(conversation.turns.len() + 1);

    if let Some(prompt) = system_prompt {
        messages.push(ModelMessage::system(prompt));
    }

    for turn in &conversation.turns {
        match turn.role {
            Role::User => {
                messages.push(ModelMessage::user(turn.text()));
            }
            Role::Assistant => {
                let mut tool_calls = Vec::new();
                let mut results = Vec::new();

                for part in &turn.parts {
                    match part {
                        Part::Text { .. } => {}
                        Part::ToolCall(call) if call.state == ToolCallState::OutputAvailable => {
                            tool_calls.push(ModelToolCall {
                                id: call.tool_call_id.clone(),
                                name: call.tool_name.clone(),
                                arguments: call.input.clone(),
                            });
                            results.push(ModelMessage::tool_result(
                                &call.tool_call_id,
                                output_as_content(call.output.as_ref()),
                            ));
                        }
                        Part::ToolCall(_) => {}
                        Part::ToolResult { tool_call_id, output } => {
                            results.push(ModelMessage::tool_result(
                                tool_call_id,
                                output_as_content(Some(output)),
                            ));
                        }
                    }
                }

                messages.push(ModelMessage::assistant(turn.text(), tool_calls));
                messages.extend(results);
            }
            Role::Tool => {
                for part in &turn.parts {
                    if let Part::ToolResult { tool_call_id, output } = part {
                        messages.push(ModelMessage::tool_result(
                            tool_call_id,
                            output_as_content(Some(output)),
                        ));
                    }
                }
            }
        }
    }

    messages
}

/// Serialize a tool output for the model: bare strings stay bare, everything
/// else becomes compact JSON.
fn output_as_content(output: Option<&Value>) -> String {
    match output {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
