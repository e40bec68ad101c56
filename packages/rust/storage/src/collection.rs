//! Vector collections: embedded chunks plus the record of indexed sources.

use chrono::{SecondsFormat, Utc};
use libsql::params;
use pdfqa_shared::{DocumentChunk, Passage, Result};
use uuid::Uuid;

use crate::{Storage, db_err, migrations, validate_identifier};

impl Storage {
    /// Create the collection table if it does not exist.
    pub async fn ensure_collection(&self, collection: &str) -> Result<()> {
        validate_identifier(collection)?;
        self.conn
            .execute_batch(&migrations::collection_ddl(collection))
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Whether `source_url` has already been indexed into `collection`.
    pub async fn is_source_indexed(&self, collection: &str, source_url: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM indexed_sources WHERE collection = ?1 AND source_url = ?2",
                params![collection, source_url],
            )
            .await
            .map_err(db_err)?;

        Ok(rows.next().await.map_err(db_err)?.is_some())
    }

    /// Insert embedded chunks in one transaction.
    ///
    /// Chunks whose content hash is already present are skipped. Returns the
    /// number of rows actually written.
    pub async fn insert_chunks(
        &self,
        collection: &str,
        chunks: &[(DocumentChunk, Vec<f32>)],
    ) -> Result<usize> {
        validate_identifier(collection)?;
        let sql = format!(
            r#"INSERT OR IGNORE INTO "{collection}"
               (id, source_url, chunk_index, content, content_hash, embedding, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#
        );
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let tx = self.conn.transaction().await.map_err(db_err)?;
        let mut inserted = 0usize;
        for (chunk, embedding) in chunks {
            let changed = tx
                .execute(
                    &sql,
                    params![
                        Uuid::now_v7().to_string(),
                        chunk.source_url.as_str(),
                        chunk.chunk_index as i64,
                        chunk.content.as_str(),
                        chunk.content_hash.as_str(),
                        embedding_to_bytes(embedding),
                        now.as_str()
                    ],
                )
                .await
                .map_err(db_err)?;
            inserted += changed as usize;
        }
        tx.commit().await.map_err(db_err)?;

        tracing::debug!(collection, inserted, offered = chunks.len(), "chunks written");
        Ok(inserted)
    }

    /// Record that `source_url` is fully indexed into `collection`.
    pub async fn record_source(
        &self,
        collection: &str,
        source_url: &str,
        document_hash: &str,
        chunk_count: usize,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO indexed_sources (collection, source_url, document_hash, chunk_count, indexed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(collection, source_url) DO UPDATE SET
                    document_hash = excluded.document_hash,
                    chunk_count = excluded.chunk_count,
                    indexed_at = excluded.indexed_at",
                params![
                    collection,
                    source_url,
                    document_hash,
                    chunk_count as i64,
                    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Drop the collection table and forget every source recorded for it.
    pub async fn drop_collection(&self, collection: &str) -> Result<()> {
        validate_identifier(collection)?;
        self.conn
            .execute(&format!(r#"DROP TABLE IF EXISTS "{collection}""#), params![])
            .await
            .map_err(db_err)?;
        self.conn
            .execute(
                "DELETE FROM indexed_sources WHERE collection = ?1",
                params![collection],
            )
            .await
            .map_err(db_err)?;
        tracing::info!(collection, "collection dropped");
        Ok(())
    }

    /// Number of chunks stored in the collection (0 if it does not exist).
    pub async fn count_chunks(&self, collection: &str) -> Result<usize> {
        validate_identifier(collection)?;
        if !self.table_exists(collection).await? {
            return Ok(0);
        }
        let mut rows = self
            .conn
            .query(&format!(r#"SELECT COUNT(*) FROM "{collection}""#), params![])
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(db_err)? as usize),
            None => Ok(0),
        }
    }

    /// The `limit` chunks most similar to `query_embedding`, best first.
    pub async fn search_collection(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<Passage>> {
        validate_identifier(collection)?;
        if limit == 0 || !self.table_exists(collection).await? {
            return Ok(Vec::new());
        }
        let mut rows = self
            .conn
            .query(
                &format!(
                    r#"SELECT source_url, chunk_index, content, embedding FROM "{collection}""#
                ),
                params![],
            )
            .await
            .map_err(db_err)?;

        let mut scored = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            let embedding = bytes_to_embedding(&row.get::<Vec<u8>>(3).map_err(db_err)?);
            scored.push(Passage {
                source_url: row.get::<String>(0).map_err(db_err)?,
                chunk_index: row.get::<i64>(1).map_err(db_err)? as usize,
                content: row.get::<String>(2).map_err(db_err)?,
                score: cosine_similarity(query_embedding, &embedding),
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }

    pub(crate) async fn table_exists(&self, name: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
            )
            .await
            .map_err(db_err)?;
        Ok(rows.next().await.map_err(db_err)?.is_some())
    }
}

/// Cosine similarity between two vectors (0.0 for mismatched or zero vectors).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Little-endian f32 encoding for BLOB storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
