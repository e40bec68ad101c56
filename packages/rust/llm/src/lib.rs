//! OpenAI-compatible model clients.
//!
//! - [`ChatClient`]: chat completions with function tools, blocking or SSE streamed
//! - [`EmbeddingClient`]: batched text embeddings
//!
//! Both carry the [`pdfqa_shared::Credential`] they were built with and send
//! it as a bearer token on every request.

mod chat;
mod embeddings;
mod types;

pub use chat::{ChatClient, DeltaSink};
pub use embeddings::EmbeddingClient;
pub use types::{ChatMessage, Completion, FunctionCall, Role, ToolCall, ToolDefinition};

const USER_AGENT: &str = concat!("pdfqa/", env!("CARGO_PKG_VERSION"));

/// Join a base URL and a path without doubling or dropping the slash.
fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}
