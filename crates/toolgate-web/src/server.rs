//! Main web server setup and startup.
//!
//! [`WebServer`] composes the Axum router, registers all routes, and starts
//! the HTTP listener.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;

use toolgate_agent::ChatRuntime;
use toolgate_store::ConversationStore;

use crate::WebConfig;
use crate::api;
use crate::state::AppState;

/// The toolgate web server.
pub struct WebServer {
    config: WebConfig,
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server.
    ///
    /// # Arguments
    ///
    /// * `config` - Bind address and port configuration.
    /// * `runtime` - The chat runtime shared across all requests.
    /// * `store` - Conversation persistence.
    pub fn new(
        config: WebConfig,
        runtime: Arc<ChatRuntime>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        let state = Arc::new(AppState::new(config.clone(), runtime, store));
        Self { config, state }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.bind_addr, self.config.port)
    }

    /// Build the Axum router with all routes registered.
    fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin("*".parse::<HeaderValue>().expect("static header value"))
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(tower_http::cors::Any);

        Router::new()
            // Chat streaming.
            .route("/api/chat", post(api::chat))
            // Service metadata.
            .route("/api/status", get(api::status))
            .route("/api/tools", get(api::tools))
            // Conversation management.
            .route("/api/conversations", get(api::list_conversations))
            .route("/api/conversations/{id}", get(api::get_conversation))
            .route("/api/conversations/{id}", delete(api::delete_conversation))
            .layer(cors)
            .with_state(Arc::clone(&self.state))
    }

    /// Start the server and block until it is shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.addr();
        let router = self.router();

        tracing::info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
