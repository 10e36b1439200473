//! Conversation data model.
//!
//! A [`Conversation`] is an ordered sequence of [`Turn`]s; each turn is an
//! ordered sequence of typed [`Part`]s.  The model is append-only with one
//! exception: pending tool-call parts of the most recent turn are patched in
//! place when a human decision (or an automatic execution) resolves them.
//!
//! Wire names are camelCase / kebab-case so the serialized form matches what
//! browser clients exchange, and a serialize/deserialize round trip
//! reproduces an identical structure.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// The author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Input from the human user.
    User,
    /// Output from the model.
    Assistant,
    /// A standalone tool result fed back into the conversation.
    Tool,
}

// ---------------------------------------------------------------------------
// Parts
// ---------------------------------------------------------------------------

/// Lifecycle state of a tool-call part.
///
/// The transition is monotonic: `input-available` becomes `output-available`
/// exactly once and the part is never re-opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCallState {
    /// The model has produced the input; execution has not happened yet.
    InputAvailable,
    /// The call is resolved and `output` is set.
    OutputAvailable,
}

/// A tool invocation requested by the model, together with its resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallPart {
    /// Unique identifier correlating this call with its eventual result.
    pub tool_call_id: String,

    /// The name of the tool to invoke.
    pub tool_name: String,

    /// Input arguments as recorded from the model's request.
    pub input: Value,

    /// Where this call is in its lifecycle.
    pub state: ToolCallState,

    /// The tool's output (or a synthesized denial), present once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl ToolCallPart {
    /// Create a new pending tool call in `input-available` state.
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: Value,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            input,
            state: ToolCallState::InputAvailable,
            output: None,
        }
    }

    /// Whether this call is still awaiting execution or a decision.
    pub fn is_pending(&self) -> bool {
        self.state == ToolCallState::InputAvailable
    }

    /// Transition to `output-available` and record the output.
    ///
    /// Callers must check [`ToolCallPart::is_pending`] first; resolving an
    /// already-resolved part would violate the monotonic state invariant.
    pub fn resolve(&mut self, output: Value) {
        self.state = ToolCallState::OutputAvailable;
        self.output = Some(output);
    }
}

/// A typed fragment within a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    /// Plain text produced by the user or the model.
    Text { text: String },

    /// A tool invocation requested by the model.
    ToolCall(ToolCallPart),

    /// A standalone tool result correlated by call id.
    #[serde(rename_all = "camelCase")]
    ToolResult { tool_call_id: String, output: Value },
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// View this part as a tool call, if it is one.
    pub fn as_tool_call(&self) -> Option<&ToolCallPart> {
        match self {
            Self::ToolCall(part) => Some(part),
            Self::Text { .. } | Self::ToolResult { .. } => None,
        }
    }

    /// Mutable view of this part as a tool call, if it is one.
    pub fn as_tool_call_mut(&mut self) -> Option<&mut ToolCallPart> {
        match self {
            Self::ToolCall(part) => Some(part),
            Self::Text { .. } | Self::ToolResult { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Turns
// ---------------------------------------------------------------------------

/// One message in a conversation, attributed to a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn identifier (UUID v7).
    pub id: String,

    /// Who produced this turn.
    pub role: Role,

    /// Ordered typed fragments.
    pub parts: Vec<Part>,
}

impl Turn {
    /// Create a turn with a fresh id.
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            role,
            parts,
        }
    }

    /// Create a user turn containing a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Create an assistant turn from parts.
    pub fn assistant(parts: Vec<Part>) -> Self {
        Self::new(Role::Assistant, parts)
    }

    /// Concatenated text content of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Find a tool-call part by call id.
    pub fn tool_call(&self, tool_call_id: &str) -> Option<&ToolCallPart> {
        self.parts
            .iter()
            .filter_map(Part::as_tool_call)
            .find(|p| p.tool_call_id == tool_call_id)
    }

    /// Find a tool-call part by call id, mutably.
    pub fn tool_call_mut(&mut self, tool_call_id: &str) -> Option<&mut ToolCallPart> {
        self.parts
            .iter_mut()
            .filter_map(Part::as_tool_call_mut)
            .find(|p| p.tool_call_id == tool_call_id)
    }
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

/// An ordered sequence of turns, identified by a stable id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier (UUID v7 unless supplied by the client).
    pub id: String,

    /// Turns in creation order.
    pub turns: Vec<Turn>,
}

impl Conversation {
    /// Create an empty conversation with a fresh id.
    pub fn new() -> Self {
        Self::with_id(Uuid::now_v7().to_string())
    }

    /// Create an empty conversation with a caller-supplied id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            turns: Vec::new(),
        }
    }

    /// Append a turn.
    pub fn push_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// The most recent turn, if any.
    pub fn latest_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The most recent turn, mutably.
    pub fn latest_turn_mut(&mut self) -> Option<&mut Turn> {
        self.turns.last_mut()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
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
    fn part_tags_and_field_names() {
        let part = Part::ToolCall(ToolCallPart::new(
            "call_1",
            "get_weather_information",
            json!({"city": "Paris"}),
        ));
        let v = serde_json::to_value(&part).unwrap();
        assert_eq!(v["type"], "tool-call");
        assert_eq!(v["toolCallId"], "call_1");
        assert_eq!(v["toolName"], "get_weather_information");
        assert_eq!(v["state"], "input-available");
        assert!(v.get("output").is_none());

        let text = serde_json::to_value(Part::text("hi")).unwrap();
        assert_eq!(text["type"], "text");
    }

    #[test]
    fn resolved_call_serializes_output() {
        let mut part = ToolCallPart::new("call_1", "get_weather_information", json!({}));
        part.resolve(json!("sunny"));

        let v = serde_json::to_value(&part).unwrap();
        assert_eq!(v["state"], "output-available");
        assert_eq!(v["output"], "sunny");
    }

    #[test]
    fn turn_round_trip_preserves_mixed_parts() {
        let mut call = ToolCallPart::new("call_9", "get_weather_information", json!({"city": "Oslo"}));
        call.resolve(json!("cloudy"));

        let turn = Turn::assistant(vec![
            Part::text("Let me check."),
            Part::ToolCall(call),
            Part::ToolResult {
                tool_call_id: "call_9".into(),
                output: json!("cloudy"),
            },
        ]);

        let encoded = serde_json::to_string(&turn).unwrap();
        let decoded: Turn = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, turn);
    }

    #[test]
    fn conversation_round_trip() {
        let mut conversation = Conversation::new();
        conversation.push_turn(Turn::user_text("What's the weather in Paris?"));
        conversation.push_turn(Turn::assistant(vec![Part::ToolCall(ToolCallPart::new(
            "call_1",
            "get_weather_information",
            json!({"city": "Paris"}),
        ))]));

        let encoded = serde_json::to_string(&conversation).unwrap();
        let decoded: Conversation = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, conversation);
    }

    #[test]
    fn tool_call_lookup_by_id() {
        let mut turn = Turn::assistant(vec![
            Part::text("calling"),
            Part::ToolCall(ToolCallPart::new("call_a", "t", json!({}))),
            Part::ToolCall(ToolCallPart::new("call_b", "t", json!({}))),
        ]);

        assert!(turn.tool_call("call_a").is_some());
        assert!(turn.tool_call("missing").is_none());

        turn.tool_call_mut("call_b").unwrap().resolve(json!(1));
        assert!(!turn.tool_call("call_b").unwrap().is_pending());
        assert!(turn.tool_call("call_a").unwrap().is_pending());
    }

    #[test]
    fn turn_text_concatenates_text_parts_only() {
        let turn = Turn::assistant(vec![
            Part::text("Hello "),
            Part::ToolCall(ToolCallPart::new("c", "t", json!({}))),
            Part::text("world"),
        ]);
        assert_eq!(turn.text(), "Hello world");
    }
}
