//! Web interface for toolgate.
//!
//! This crate provides the HTTP server that exposes the chat runtime:
//!
//! - `POST /api/chat` — submit a text turn or a tool decision; responds with
//!   an SSE stream of turn/part updates as generation progresses.
//! - REST routes for status, tool discovery, and conversation management.

pub mod api;
pub mod server;
pub mod state;

pub use server::WebServer;
pub use state::AppState;

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 3000,
        }
    }
}
