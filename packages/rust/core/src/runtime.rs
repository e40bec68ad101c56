//! Live collaborators: libSQL storage, HTTP PDF reader, OpenAI-compatible models.

use std::sync::Arc;

use tracing::debug;

use pdfqa_llm::{ChatClient, DeltaSink, EmbeddingClient};
use pdfqa_reader::PdfReader;
use pdfqa_shared::{AppConfig, AssistantOptions, Credential, Result, SessionId};
use pdfqa_storage::Storage;

use crate::assistant::KnowledgeAssistant;
use crate::collaborators::Collaborators;
use crate::history::LibsqlHistory;
use crate::knowledge::PdfUrlKnowledgeBase;

/// Builds real handles from the application config.
#[derive(Clone)]
pub struct LiveCollaborators {
    config: AppConfig,
    allow_localhost: bool,
    delta_sink: Option<DeltaSink>,
}

impl LiveCollaborators {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            allow_localhost: false,
            delta_sink: None,
        }
    }

    /// Allow document downloads from localhost/private IPs.
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    /// Stream model output to `sink` (only used when submissions stream).
    pub fn with_delta_sink(mut self, sink: DeltaSink) -> Self {
        self.delta_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl Collaborators for LiveCollaborators {
    type Knowledge = PdfUrlKnowledgeBase;
    type History = LibsqlHistory;
    type Assistant = KnowledgeAssistant<PdfUrlKnowledgeBase, LibsqlHistory>;

    async fn knowledge(
        &self,
        credential: &Credential,
        storage_address: &str,
        sources: Vec<String>,
        collection: &str,
    ) -> Result<PdfUrlKnowledgeBase> {
        let storage = Storage::connect(storage_address).await?;
        let mut reader = PdfReader::new(&self.config.chunking)?;
        if self.allow_localhost {
            reader = reader.allow_localhost()?;
        }
        let key = self
            .config
            .embeddings
            .resolve_key(credential, &self.config.model.base_url)?;
        let embedder = EmbeddingClient::new(&self.config.embeddings, key)?;

        debug!(collection, sources = sources.len(), "knowledge handle ready");
        PdfUrlKnowledgeBase::open(storage, reader, embedder, sources, collection).await
    }

    async fn history(&self, storage_address: &str, table: &str) -> Result<LibsqlHistory> {
        let storage = Storage::connect(storage_address).await?;
        LibsqlHistory::open(storage, table).await
    }

    fn assistant(
        &self,
        knowledge: Arc<PdfUrlKnowledgeBase>,
        history: LibsqlHistory,
        options: AssistantOptions,
        credential: &Credential,
        session_id: SessionId,
    ) -> Result<Self::Assistant> {
        let chat = ChatClient::new(
            self.config.model.base_url.as_str(),
            credential.clone(),
            options.model_id.as_str(),
        )?;
        let assistant = KnowledgeAssistant::new(knowledge, history, chat, options, session_id)?;
        Ok(match &self.delta_sink {
            Some(sink) => assistant.with_delta_sink(Arc::clone(sink)),
            None => assistant,
        })
    }
}
