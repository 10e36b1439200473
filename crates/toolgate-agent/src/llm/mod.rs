//! Model client: wire types, streaming parser, and HTTP transport.
//!
//! The hosted model is an external collaborator: it receives the full
//! patched conversation plus the declared tool schemas and returns either
//! text or a request to call a named tool with structured input.  The
//! [`LanguageModel`] trait is the seam the runtime depends on; tests script
//! it, production uses [`HttpModelClient`].

pub mod client;
pub mod streaming;
pub mod types;

pub use client::{HttpModelClient, LanguageModel, ModelConfig};
pub use streaming::ChatStreamAccumulator;
pub use types::{
    MessageRole, ModelMessage, ModelRequest, ModelResponse, ModelToolCall, to_model_messages,
};
