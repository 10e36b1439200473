//! CLI entry point for toolgate.
//!
//! This binary provides the `toolgate` command with subcommands for starting
//! the HTTP server and inspecting the tool registry.

mod cli;
mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use toolgate_agent::{
    ChatRuntime, HttpModelClient, LanguageModel, ModelConfig, RuntimeConfig, ToolRegistry,
    WeatherTool,
};
use toolgate_store::{
    ConversationStore, Database, MemoryConversationStore, SqliteConversationStore,
};
use toolgate_web::{WebConfig, WebServer};

use crate::cli::{Cli, Commands};
use crate::config::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = ServiceConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind, port, db } => cmd_serve(config, bind, port, db).await,
        Commands::Tools => cmd_tools(),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(
    mut config: ServiceConfig,
    bind: Option<String>,
    port: Option<u16>,
    db: Option<std::path::PathBuf>,
) -> anyhow::Result<()> {
    init_tracing();

    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(db) = db {
        config.storage.db_path = Some(db);
    }

    // Model client.
    let api_key = config
        .api_key()
        .context("OPENAI_API_KEY is not set; the server cannot reach the model provider")?;
    let model: Arc<dyn LanguageModel> = Arc::new(HttpModelClient::new(ModelConfig::compatible(
        api_key,
        config.model.model.clone(),
        config.model.base_url.clone(),
    ))?);

    // Tool registry.
    let registry = build_registry();
    info!(tool_count = registry.len(), "tools registered");

    // Conversation store.
    let store: Arc<dyn ConversationStore> = match &config.storage.db_path {
        Some(path) => {
            let db = Database::open_and_migrate(path.clone())
                .await
                .context("failed to open database")?;
            info!(path = %path.display(), "store initialized");
            Arc::new(SqliteConversationStore::new(db))
        }
        None => {
            info!("using in-memory conversation store");
            Arc::new(MemoryConversationStore::new())
        }
    };

    // Chat runtime.
    let runtime = Arc::new(ChatRuntime::new(
        model,
        Arc::new(registry),
        RuntimeConfig {
            max_steps: config.model.max_steps,
            model: config.model.model.clone(),
            temperature: config.model.temperature,
            max_tokens: Some(4096),
            system_prompt: config.model.system_prompt.clone(),
        },
    ));

    // HTTP server.
    let web_config = WebConfig {
        bind_addr: config.server.bind.clone(),
        port: config.server.port,
    };
    let server = WebServer::new(web_config, runtime, store);
    info!(addr = %server.addr(), "toolgate v{}", env!("CARGO_PKG_VERSION"));

    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))
}

// ---------------------------------------------------------------------------
// Subcommand: tools
// ---------------------------------------------------------------------------

fn cmd_tools() -> anyhow::Result<()> {
    let registry = build_registry();

    println!("{:<28} {:<14} DESCRIPTION", "NAME", "CONFIRMATION");
    let mut tools: Vec<_> = registry.iter().collect();
    tools.sort_by_key(|t| t.name().to_owned());
    for tool in tools {
        println!(
            "{:<28} {:<14} {}",
            tool.name(),
            if tool.requires_confirmation() {
                "required"
            } else {
                "automatic"
            },
            tool.description()
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Register the built-in tools.
fn build_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WeatherTool::new()));
    registry
}

/// Initialize the tracing subscriber from `RUST_LOG`, defaulting to info.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
