//! Tool trait and registry.
//!
//! Tools implement the [`Tool`] trait so the chat runtime can declare them to
//! the model and invoke them uniformly.  A tool flagged with
//! [`Tool::requires_confirmation`] is never auto-executed: the runtime leaves
//! its call pending until a human decision resolves it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// ---------------------------------------------------------------------------
// Tool trait
// ---------------------------------------------------------------------------

/// A tool the model may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name, as declared to the model.
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's input parameters.
    fn input_schema(&self) -> Value;

    /// Whether a human must confirm each invocation before it runs.
    fn requires_confirmation(&self) -> bool {
        false
    }

    /// The fixed output substituted when a human denies an invocation.
    fn denied_output(&self) -> Value {
        Value::String(format!("Error: User denied access to {}", self.name()))
    }

    /// Execute the tool with validated input.
    ///
    /// The output may be any serializable JSON value.
    async fn execute(&self, input: Value) -> Result<Value>;
}

// ---------------------------------------------------------------------------
// Schema declaration
// ---------------------------------------------------------------------------

/// A tool declaration sent to the model so it knows what is available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool name.
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// JSON Schema describing the input shape.
    pub input_schema: Value,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Name-keyed collection of registered tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its declared name, replacing any previous
    /// registration of the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        tracing::debug!(tool = tool.name(), "registering tool");
        self.tools.insert(tool.name().to_owned(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Whether the named tool exists and requires human confirmation.
    pub fn requires_confirmation(&self, name: &str) -> bool {
        self.tools
            .get(name)
            .is_some_and(|t| t.requires_confirmation())
    }

    /// Declarations for all registered tools, sorted by name for a stable
    /// request shape.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_owned(),
                description: t.description().to_owned(),
                input_schema: t.input_schema(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Iterate over registered tools.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
