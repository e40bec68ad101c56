//! Error types for the PDF knowledge assistant.
//!
//! Library crates use [`PdfQaError`] via `thiserror`.
//! App crates (cli/tui) wrap this with `color-eyre` for rich diagnostics.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::InputField;

/// The orchestrator phase an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Building the knowledge, history, and assistant handles.
    Construction,
    /// `ensure_indexed` on the knowledge handle.
    Indexing,
    /// `run` on the assistant handle.
    Query,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construction => write!(f, "construction"),
            Self::Indexing => write!(f, "indexing"),
            Self::Query => write!(f, "query"),
        }
    }
}

/// Top-level error type for all PDF assistant operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfQaError {
    /// One or more required form fields were empty.
    #[error("Please fill all fields: {}", join_fields(fields))]
    MissingInput { fields: Vec<InputField> },

    /// Malformed store address, invalid identifier, unreachable store, bad options.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Fetching, parsing, embedding, or writing the document failed.
    #[error("indexing failed: {reason}")]
    Indexing { reason: String },

    /// Retrieval, model invocation, or history persistence failed while answering.
    #[error("query failed: {reason}")]
    Query { reason: String },

    /// A stage did not finish within its time budget.
    #[error("{stage} timed out after {}s", after.as_secs())]
    Timeout { stage: Stage, after: Duration },

    /// Network/HTTP error while downloading a document.
    #[error("network error: {0}")]
    Network(String),

    /// PDF or response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Chat completion endpoint error.
    #[error("model error: {0}")]
    Model(String),

    /// Embedding endpoint error.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PdfQaError>;

fn join_fields(fields: &[InputField]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PdfQaError {
    /// Create a configuration error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create an indexing error from any displayable reason.
    pub fn indexing(reason: impl fmt::Display) -> Self {
        Self::Indexing {
            reason: reason.to_string(),
        }
    }

    /// Create a query error from any displayable reason.
    pub fn query(reason: impl fmt::Display) -> Self {
        Self::Query {
            reason: reason.to_string(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attribute a collaborator error to an orchestrator stage.
    ///
    /// Errors that are already classified (missing input, configuration,
    /// indexing, query, timeout) pass through unchanged.
    pub fn during(self, stage: Stage) -> Self {
        match self {
            Self::MissingInput { .. }
            | Self::Configuration { .. }
            | Self::Indexing { .. }
            | Self::Query { .. }
            | Self::Timeout { .. } => self,
            other => match stage {
                Stage::Construction => Self::config(other.to_string()),
                Stage::Indexing => Self::indexing(other),
                Stage::Query => Self::query(other),
            },
        }
    }

    /// The stage this error belongs to, if it has been classified.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Configuration { .. } => Some(Stage::Construction),
            Self::Indexing { .. } => Some(Stage::Indexing),
            Self::Query { .. } => Some(Stage::Query),
            Self::Timeout { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
