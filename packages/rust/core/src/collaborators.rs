//! The seams the orchestrator is built against.
//!
//! Each trait has one live implementation in this crate and any number of
//! test doubles. Futures are `Send` so submissions can run on spawned tasks.

use std::future::Future;
use std::sync::Arc;

use pdfqa_reader::{PdfReader, ReadDocument};
use pdfqa_llm::EmbeddingClient;
use pdfqa_shared::{
    AssistantOptions, ChatTurn, Credential, IndexOutcome, Passage, Result, SessionId,
};

/// A searchable, indexable document collection.
pub trait KnowledgeBase: Send + Sync {
    /// Make sure every source is present in the collection.
    ///
    /// With `force_recreate` the collection is cleared first and every source
    /// is indexed again.
    fn ensure_indexed(
        &self,
        force_recreate: bool,
    ) -> impl Future<Output = Result<Vec<IndexOutcome>>> + Send;

    /// The `limit` passages most relevant to `query`.
    fn search(&self, query: &str, limit: usize)
    -> impl Future<Output = Result<Vec<Passage>>> + Send;
}

/// Persistent chat history for assistant sessions.
pub trait HistoryStore: Send + Sync {
    /// The last `limit` turns of `session`, oldest first.
    fn recent_turns(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ChatTurn>>> + Send;

    fn append_turn(&self, turn: &ChatTurn) -> impl Future<Output = Result<()>> + Send;
}

/// Answers questions.
pub trait Assistant: Send + Sync {
    fn run(&self, question: &str, stream: bool) -> impl Future<Output = Result<String>> + Send;
}

/// Builds the handles one submission needs.
///
/// Every call receives the submission's own credential and store address;
/// implementations keep no per-submission state.
pub trait Collaborators: Send + Sync {
    type Knowledge: KnowledgeBase + 'static;
    type History: HistoryStore + 'static;
    type Assistant: Assistant;

    fn knowledge(
        &self,
        credential: &Credential,
        storage_address: &str,
        sources: Vec<String>,
        collection: &str,
    ) -> impl Future<Output = Result<Self::Knowledge>> + Send;

    fn history(
        &self,
        storage_address: &str,
        table: &str,
    ) -> impl Future<Output = Result<Self::History>> + Send;

    fn assistant(
        &self,
        knowledge: Arc<Self::Knowledge>,
        history: Self::History,
        options: AssistantOptions,
        credential: &Credential,
        session_id: SessionId,
    ) -> Result<Self::Assistant>;
}

/// Turns a document URL into chunks.
pub trait DocumentReader: Send + Sync {
    fn read(&self, source_url: &str) -> impl Future<Output = Result<ReadDocument>> + Send;
}

/// Turns text into vectors.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;

    fn embed_query(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;
}

impl DocumentReader for PdfReader {
    async fn read(&self, source_url: &str) -> Result<ReadDocument> {
        PdfReader::read(self, source_url).await
    }
}

impl Embedder for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        EmbeddingClient::embed(self, texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(text).await
    }
}
