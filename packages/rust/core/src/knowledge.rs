//! PDF-URL knowledge base backed by a libSQL vector collection.

use tracing::{debug, info, instrument};

use pdfqa_llm::EmbeddingClient;
use pdfqa_reader::PdfReader;
use pdfqa_shared::{DocumentChunk, IndexOutcome, IndexStatus, Passage, PdfQaError, Result};
use pdfqa_storage::{Storage, validate_identifier};

use crate::collaborators::{DocumentReader, Embedder, KnowledgeBase};

/// A fixed list of PDF URLs indexed into one named collection.
pub struct PdfUrlKnowledgeBase<R = PdfReader, E = EmbeddingClient> {
    storage: Storage,
    reader: R,
    embedder: E,
    sources: Vec<String>,
    collection: String,
}

impl<R: DocumentReader, E: Embedder> PdfUrlKnowledgeBase<R, E> {
    /// Bind the sources to `collection` in `storage`, creating the collection if needed.
    pub async fn open(
        storage: Storage,
        reader: R,
        embedder: E,
        sources: Vec<String>,
        collection: impl Into<String>,
    ) -> Result<Self> {
        let collection = collection.into();
        validate_identifier(&collection)?;
        storage.ensure_collection(&collection).await?;

        Ok(Self {
            storage,
            reader,
            embedder,
            sources,
            collection,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    async fn index_source(&self, source_url: &str) -> Result<IndexOutcome> {
        let document = self.reader.read(source_url).await?;
        if document.chunks.is_empty() {
            return Err(PdfQaError::parse(format!(
                "{source_url}: no text to index"
            )));
        }

        let texts: Vec<String> = document.chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(PdfQaError::Embedding(format!(
                "{} chunks but {} embeddings",
                texts.len(),
                vectors.len()
            )));
        }

        let chunk_count = document.chunks.len();
        let rows: Vec<(DocumentChunk, Vec<f32>)> =
            document.chunks.into_iter().zip(vectors).collect();
        let inserted = self.storage.insert_chunks(&self.collection, &rows).await?;
        self.storage
            .record_source(
                &self.collection,
                source_url,
                &document.document_hash,
                chunk_count,
            )
            .await?;

        info!(source_url, chunk_count, inserted, "source indexed");
        Ok(IndexOutcome {
            source_url: source_url.to_string(),
            status: IndexStatus::Indexed { chunks: inserted },
        })
    }
}

impl<R: DocumentReader, E: Embedder> KnowledgeBase for PdfUrlKnowledgeBase<R, E> {
    #[instrument(skip_all, fields(collection = %self.collection, force_recreate))]
    async fn ensure_indexed(&self, force_recreate: bool) -> Result<Vec<IndexOutcome>> {
        if force_recreate {
            self.storage.drop_collection(&self.collection).await?;
        }
        self.storage.ensure_collection(&self.collection).await?;

        let mut outcomes = Vec::with_capacity(self.sources.len());
        for source_url in &self.sources {
            if !force_recreate
                && self
                    .storage
                    .is_source_indexed(&self.collection, source_url)
                    .await?
            {
                debug!(%source_url, "already indexed, skipping");
                outcomes.push(IndexOutcome {
                    source_url: source_url.clone(),
                    status: IndexStatus::AlreadyIndexed,
                });
                continue;
            }
            outcomes.push(self.index_source(source_url).await?);
        }
        Ok(outcomes)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Passage>> {
        let embedding = self.embedder.embed_query(query).await?;
        self.storage
            .search_collection(&self.collection, &embedding, limit)
            .await
    }
}
