//! Chat runtime for toolgate.
//!
//! This crate implements the core of the service: conversations made of
//! turns and typed parts, a tool registry with confirmation gating, the
//! human-in-the-loop decision resolver, and the bounded re-entry loop that
//! drives generation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌───────────┐
//! │ ChatRuntime  │────>│ ToolRegistry │────>│   Tools   │
//! │ (re-entry)   │     │ (gate/exec)  │     │ (weather) │
//! └──────┬───────┘     └──────┬──────┘     └───────────┘
//!        │                    │
//!        │             ┌──────┴───────┐
//!        │             │ Confirmation │  <- human decisions
//!        │             │  Resolver    │
//!        │             └──────────────┘
//! ┌──────┴───────┐     ┌──────────────┐
//! │ Model client │     │  Streaming   │
//! │ (HTTP, SSE)  │     │   (events)   │
//! └──────────────┘     └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`conversation`] -- conversations, turns, and the part sum type.
//! - [`tool`] -- the tool trait, schemas, and the registry.
//! - [`tools`] -- built-in tools (weather lookup).
//! - [`confirm`] -- the interceptor and the decision resolver.
//! - [`runtime`] -- the bounded response re-entry loop.
//! - [`llm`] -- model wire types, SSE parsing, and the HTTP client.
//! - [`events`] -- the outbound chat event stream.
//! - [`error`] -- agent error types.

pub mod confirm;
pub mod conversation;
pub mod error;
pub mod events;
pub mod llm;
pub mod runtime;
pub mod tool;
pub mod tools;

// Re-export the most commonly used types at the crate root.
pub use confirm::{
    CONFIRM_SENTINEL, DENY_SENTINEL, Decision, DecisionOutcome, PendingConfirmation, ToolDecision,
    apply_decision, pending_confirmations,
};
pub use conversation::{Conversation, Part, Role, ToolCallPart, ToolCallState, Turn};
pub use error::{AgentError, Result};
pub use events::{ChatEvent, EventSink};
pub use llm::{
    HttpModelClient, LanguageModel, ModelConfig, ModelRequest, ModelResponse, ModelToolCall,
    to_model_messages,
};
pub use runtime::{ChatRuntime, DEFAULT_MAX_STEPS, RunOutcome, RunStatus, RuntimeConfig};
pub use tool::{Tool, ToolRegistry, ToolSchema};
pub use tools::WeatherTool;
