//! Service configuration.
//!
//! Settings load from an optional TOML file and are then overridden by
//! environment variables.  The API key is environment-only
//! (`OPENAI_API_KEY`) so it never lands in a config file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use toolgate_agent::DEFAULT_MAX_STEPS;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub storage: StorageSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind to.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model identifier for generation requests.
    pub model: String,
    /// OpenAI-compatible base URL.
    pub base_url: String,
    /// Optional sampling temperature.
    pub temperature: Option<f32>,
    /// Bound on model/tool round-trips per run.
    pub max_steps: u32,
    /// Optional system prompt prepended to every request.
    pub system_prompt: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            base_url: "https://api.openai.com/v1".into(),
            temperature: None,
            max_steps: DEFAULT_MAX_STEPS,
            system_prompt: None,
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite database path.  `None` keeps conversations in memory only.
    pub db_path: Option<PathBuf>,
}

impl ServiceConfig {
    /// Load configuration from an optional TOML file, then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("failed to parse config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Override settings from `TOOLGATE_*` / `OPENAI_*` environment variables.
    fn apply_env(&mut self) {
        if let Ok(model) = std::env::var("TOOLGATE_MODEL") {
            self.model.model = model;
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            self.model.base_url = base_url;
        }
        if let Ok(db_path) = std::env::var("TOOLGATE_DB") {
            self.storage.db_path = Some(PathBuf::from(db_path));
        }
    }

    /// The API key, read from the environment only.
    pub fn api_key(&self) -> Option<String> {
        std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
