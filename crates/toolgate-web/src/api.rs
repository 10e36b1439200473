//! REST and streaming API route handlers.
//!
//! The chat endpoint accepts either a new text turn or a tool decision and
//! streams chat events back over SSE.  Management endpoints cover status,
//! tool discovery, and stored conversations.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use toolgate_agent::{AgentError, ChatEvent, Conversation, EventSink, ToolDecision, Turn, apply_decision};
use toolgate_store::{ConversationSummary, StoreError};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// A handler failure rendered as a JSON error body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match err {
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        let status = match err {
            // A decision naming a stale or mismatched call is a client error.
            AgentError::UnknownToolCall { .. } | AgentError::ValidationError { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AgentError::UnknownTool { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/chat
// ---------------------------------------------------------------------------

/// Request body for the chat endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    /// Existing conversation to continue; omitted to start a new one.
    #[serde(default)]
    pub conversation_id: Option<String>,

    /// The user's submission: a text turn or a tool decision.
    pub input: ChatInput,
}

/// The two kinds of inbound submission.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChatInput {
    /// A decision payload resolving a pending tool call.
    Decision(ToolDecision),

    /// A new user text turn.
    Text { text: String },
}

/// Submit input and stream the resulting turn/part updates as SSE events.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conversation = match &body.conversation_id {
        Some(id) => match state.store.get(id).await {
            Ok(conversation) => conversation,
            Err(StoreError::NotFound { .. }) => Conversation::with_id(id.clone()),
            Err(e) => return Err(e.into()),
        },
        None => Conversation::new(),
    };

    let (tx, rx) = mpsc::channel::<ChatEvent>(64);
    let events = EventSink::new(tx);

    match body.input {
        ChatInput::Text { text } => {
            conversation.push_turn(Turn::user_text(text));
        }
        ChatInput::Decision(decision) => {
            // Applied / AlreadyResolved / NoDecision all proceed to re-entry;
            // a stale or mismatched decision is rejected before streaming.
            apply_decision(&mut conversation, &decision, state.runtime.tools(), &events).await?;
        }
    }

    let runtime = Arc::clone(&state.runtime);
    let store = Arc::clone(&state.store);
    tokio::spawn(async move {
        let conversation_id = conversation.id.clone();
        let outcome = runtime.run(&mut conversation, &events).await;

        if let Err(e) = store.put(&conversation).await {
            tracing::error!(conversation_id = %conversation_id, error = %e, "failed to persist conversation");
            events
                .emit(ChatEvent::Error {
                    message: format!("failed to persist conversation: {e}"),
                })
                .await;
            return;
        }

        match outcome {
            Ok(outcome) => {
                events
                    .emit(ChatEvent::Finish {
                        conversation_id,
                        status: outcome.status,
                        steps: outcome.steps_used,
                    })
                    .await;
            }
            Err(e) => {
                tracing::error!(conversation_id = %conversation_id, error = %e, "run failed");
                events
                    .emit(ChatEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
            }
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| Event::default().json_data(&event));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Response payload for the `/api/status` endpoint.
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub tool_count: usize,
    pub uptime_seconds: u64,
}

/// Return basic service status.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        tool_count: state.runtime.tools().len(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

// ---------------------------------------------------------------------------
// GET /api/tools
// ---------------------------------------------------------------------------

/// Serializable summary of a single registered tool.
#[derive(Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    pub requires_confirmation: bool,
}

/// List all registered tools and their confirmation flags.
pub async fn tools(State(state): State<Arc<AppState>>) -> Json<Vec<ToolInfo>> {
    let mut infos: Vec<ToolInfo> = state
        .runtime
        .tools()
        .iter()
        .map(|tool| ToolInfo {
            name: tool.name().to_owned(),
            description: tool.description().to_owned(),
            parameters: tool.input_schema(),
            requires_confirmation: tool.requires_confirmation(),
        })
        .collect();
    infos.sort_by(|a, b| a.name.cmp(&b.name));
    Json(infos)
}

// ---------------------------------------------------------------------------
// Conversation management
// ---------------------------------------------------------------------------

/// List stored conversations, most recently updated first.
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

/// Fetch a full conversation by id.
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(state.store.get(&id).await?))
}

/// Delete a conversation by id.
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_input_parses_text() {
        let body: ChatRequestBody =
            serde_json::from_value(json!({ "input": { "text": "hello" } })).unwrap();
        assert!(body.conversation_id.is_none());
        assert!(matches!(body.input, ChatInput::Text { ref text } if text == "hello"));
    }

    #[test]
    fn chat_input_parses_decision() {
        let body: ChatRequestBody = serde_json::from_value(json!({
            "conversationId": "conv_1",
            "input": {
                "toolCallId": "call_1",
                "tool": "get_weather_information",
                "output": "Yes, confirmed."
            }
        }))
        .unwrap();

        assert_eq!(body.conversation_id.as_deref(), Some("conv_1"));
        let ChatInput::Decision(decision) = body.input else {
            panic!("expected decision input");
        };
        assert_eq!(decision.tool_call_id, "call_1");
        assert_eq!(decision.output, "Yes, confirmed.");
    }

    #[test]
    fn chat_input_rejects_garbage() {
        let result =
            serde_json::from_value::<ChatRequestBody>(json!({ "input": { "bogus": true } }));
        assert!(result.is_err());
    }
}
