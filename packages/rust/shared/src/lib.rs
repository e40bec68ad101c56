//! Shared types, error model, and configuration for the PDF knowledge assistant.
//!
//! This crate is the foundation depended on by all other pdfqa crates.
//! It provides:
//! - [`PdfQaError`]: the unified error type
//! - Domain types ([`SessionInput`], [`Credential`], [`AssistantOptions`], [`ChatTurn`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChunkingConfig, DefaultsConfig, EmbeddingsConfig, ModelConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{PdfQaError, Result, Stage};
pub use types::{
    Answer, AssistantOptions, ChatTurn, Credential, DocumentChunk, IndexOutcome, IndexStatus,
    InputField, Passage, SessionId, SessionInput, SessionSummary, content_hash,
};
