//! Core domain types for the PDF knowledge assistant.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{PdfQaError, Result};

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for chat session identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new time-sortable session identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// An API key supplied with a submission.
///
/// Formatting never reveals the secret; use [`Credential::expose`] at the
/// point where it goes into a request header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

// ---------------------------------------------------------------------------
// Session input
// ---------------------------------------------------------------------------

/// The four required form fields, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputField {
    Credential,
    StorageAddress,
    DocumentSource,
    Question,
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credential => write!(f, "API key"),
            Self::StorageAddress => write!(f, "Database URL"),
            Self::DocumentSource => write!(f, "PDF URL"),
            Self::Question => write!(f, "Question"),
        }
    }
}

/// One form submission.
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub credential: Credential,
    pub storage_address: String,
    pub document_source: String,
    pub question: String,
    /// Continue an earlier chat session instead of starting a new one.
    pub session_id: Option<SessionId>,
}

impl SessionInput {
    pub fn new(
        credential: impl Into<String>,
        storage_address: impl Into<String>,
        document_source: impl Into<String>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            credential: Credential::new(credential),
            storage_address: storage_address.into(),
            document_source: document_source.into(),
            question: question.into(),
            session_id: None,
        }
    }

    /// Continue the given session.
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Fields that are empty or whitespace-only, in form order.
    pub fn missing_fields(&self) -> Vec<InputField> {
        let mut missing = Vec::new();
        if self.credential.is_empty() {
            missing.push(InputField::Credential);
        }
        if self.storage_address.trim().is_empty() {
            missing.push(InputField::StorageAddress);
        }
        if self.document_source.trim().is_empty() {
            missing.push(InputField::DocumentSource);
        }
        if self.question.trim().is_empty() {
            missing.push(InputField::Question);
        }
        missing
    }

    /// Fail with [`PdfQaError::MissingInput`] unless every field is filled.
    pub fn validate(&self) -> Result<()> {
        let fields = self.missing_fields();
        if fields.is_empty() {
            Ok(())
        } else {
            Err(PdfQaError::MissingInput { fields })
        }
    }
}

// ---------------------------------------------------------------------------
// AssistantOptions
// ---------------------------------------------------------------------------

/// Behaviour of the assistant runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantOptions {
    /// Chat model identifier sent to the completions endpoint.
    pub model_id: String,
    /// Prefix the answer with the tool calls the model made.
    pub show_tool_calls: bool,
    /// Offer the `search_knowledge_base` tool.
    pub search_knowledge: bool,
    /// Offer the `get_chat_history` tool.
    pub read_chat_history: bool,
    /// Maximum model round-trips before giving up.
    pub max_tool_rounds: u32,
    /// Upper bound on turns returned by `get_chat_history`.
    pub history_turns: u32,
    /// Passages returned per knowledge search.
    pub search_limit: u32,
}

impl AssistantOptions {
    /// Check the options before any handle is built from them.
    pub fn validate(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(PdfQaError::config("assistant model_id must not be empty"));
        }
        if self.max_tool_rounds == 0 {
            return Err(PdfQaError::config("max_tool_rounds must be at least 1"));
        }
        if self.search_limit == 0 {
            return Err(PdfQaError::config("search_limit must be at least 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Documents and retrieval
// ---------------------------------------------------------------------------

/// A slice of extracted document text, ready to embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub source_url: String,
    pub chunk_index: usize,
    pub content: String,
    /// SHA-256 of `content`.
    pub content_hash: String,
}

impl DocumentChunk {
    pub fn new(source_url: impl Into<String>, chunk_index: usize, content: String) -> Self {
        let content_hash = content_hash(content.as_bytes());
        Self {
            source_url: source_url.into(),
            chunk_index,
            content,
            content_hash,
        }
    }
}

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub source_url: String,
    pub chunk_index: usize,
    pub content: String,
    pub score: f32,
}

/// Result of indexing a single document source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOutcome {
    pub source_url: String,
    pub status: IndexStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// Fetched, chunked, and embedded; `chunks` rows were written.
    Indexed { chunks: usize },
    /// Already recorded for the collection; nothing was fetched.
    AlreadyIndexed,
}

// ---------------------------------------------------------------------------
// Chat history
// ---------------------------------------------------------------------------

/// One persisted question/answer exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: String,
    pub session_id: String,
    pub model: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(
        session_id: &SessionId,
        model: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            session_id: session_id.to_string(),
            model: model.into(),
            question: question.into(),
            answer: answer.into(),
            created_at: Utc::now(),
        }
    }
}

/// Summary row for a stored chat session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: String,
    pub turns: usize,
    pub last_activity: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Answer
// ---------------------------------------------------------------------------

/// What a successful submission returns for rendering.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub session_id: SessionId,
    pub index: Vec<IndexOutcome>,
    pub elapsed: Duration,
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
