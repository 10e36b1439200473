//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers.  It holds the chat runtime (model client + tool registry) and
//! the conversation store; handlers never touch ambient globals.

use std::sync::Arc;
use std::time::Instant;

use toolgate_agent::ChatRuntime;
use toolgate_store::ConversationStore;

use crate::WebConfig;

/// Shared state accessible from every Axum handler.
#[derive(Clone)]
pub struct AppState {
    /// The chat runtime driving generation and tool execution.
    pub runtime: Arc<ChatRuntime>,

    /// Conversation persistence, injected per instance.
    pub store: Arc<dyn ConversationStore>,

    /// Web server configuration.
    pub config: WebConfig,

    /// Server start time, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Create the shared state.
    pub fn new(
        config: WebConfig,
        runtime: Arc<ChatRuntime>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            runtime,
            store,
            config,
            started_at: Instant::now(),
        }
    }
}
