//! Submission orchestration and domain logic for the PDF knowledge assistant.
//!
//! This crate ties together PDF reading, embedding, libSQL storage, and the
//! chat model into one workflow: [`QueryOrchestrator::handle_submission`].

pub mod assistant;
pub mod collaborators;
pub mod history;
pub mod knowledge;
pub mod orchestrator;
pub mod runtime;

pub use assistant::KnowledgeAssistant;
pub use collaborators::{Assistant, Collaborators, DocumentReader, Embedder, HistoryStore, KnowledgeBase};
pub use history::LibsqlHistory;
pub use knowledge::PdfUrlKnowledgeBase;
pub use orchestrator::{
    LOADING_PHASE, OrchestratorSettings, ProgressReporter, QUERY_PHASE, QueryOrchestrator,
    SilentProgress,
};
pub use pdfqa_llm::DeltaSink;
pub use runtime::LiveCollaborators;
