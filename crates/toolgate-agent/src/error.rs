//! Agent error types.
//!
//! All runtime subsystems surface errors through [`AgentError`].  Each variant
//! carries enough context for callers to decide how to handle the failure.

/// Unified error type for the chat runtime.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    // -- Model errors --------------------------------------------------------
    /// An HTTP request to the model provider failed.
    #[error("model request failed: {reason}")]
    ModelRequestFailed { reason: String },

    /// The model response could not be parsed into the expected format.
    #[error("model response parse error: {reason}")]
    ModelParseFailed { reason: String },

    /// The streaming SSE connection was interrupted or produced invalid data.
    #[error("model stream error: {reason}")]
    ModelStreamError { reason: String },

    /// The API key is missing for a provider that requires one.
    #[error("missing api key for provider: {provider}")]
    MissingApiKey { provider: String },

    // -- Tool errors ---------------------------------------------------------
    /// A tool name does not exist in the registry.
    #[error("unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    /// A tool invocation failed.
    #[error("tool execution failed for `{tool_name}`: {reason}")]
    ToolExecutionFailed { tool_name: String, reason: String },

    // -- Confirmation errors -------------------------------------------------
    /// A decision referenced a tool call id that is not present in the
    /// conversation (e.g. a stale client).
    #[error("no tool call with id `{tool_call_id}` in the latest turn")]
    UnknownToolCall { tool_call_id: String },

    /// Validation failed for input data.
    #[error("validation error: {reason}")]
    ValidationError { reason: String },

    // -- Serialization -------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    // -- Generic -------------------------------------------------------------
    /// Catch-all for unexpected internal errors.  Prefer a typed variant
    /// whenever possible.
    #[error("internal agent error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::ModelRequestFailed {
            reason: err.to_string(),
        }
    }
}
