//! Embeddings client (`POST {base_url}/embeddings`).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use pdfqa_shared::{Credential, EmbeddingsConfig, PdfQaError, Result};

use crate::{USER_AGENT, endpoint};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Embeds text through an OpenAI-compatible endpoint, in fixed-size batches.
#[derive(Clone)]
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    credential: Credential,
    model: String,
    batch_size: usize,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingsConfig, credential: Credential) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PdfQaError::Embedding(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            credential,
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
        })
    }

    /// Embed every text, preserving input order.
    #[instrument(skip_all, fields(model = %self.model, texts = texts.len()))]
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (n, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(batch = n, size = batch.len(), "embedding batch");
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }

    /// Embed a single query string.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| PdfQaError::Embedding("empty embedding response".into()))
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "embeddings"))
            .bearer_auth(self.credential.expose())
            .json(&EmbeddingRequest {
                model: &self.model,
                input: batch,
            })
            .send()
            .await
            .map_err(|e| PdfQaError::Embedding(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PdfQaError::Embedding(format!("HTTP {status}: {text}")));
        }

        let mut data: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PdfQaError::Embedding(format!("invalid embedding response: {e}")))?;

        if data.data.len() != batch.len() {
            return Err(PdfQaError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                data.data.len()
            )));
        }
        data.data.sort_by_key(|d| d.index);
        Ok(data.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn config(server: &MockServer, batch_size: usize) -> EmbeddingsConfig {
        EmbeddingsConfig {
            base_url: server.uri(),
            batch_size,
            ..EmbeddingsConfig::default()
        }
    }

    /// Echo back one two-dimensional vector per input, `[len, position]`, in reverse order.
    fn echo(req: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        let inputs = body["input"].as_array().unwrap();
        let data: Vec<_> = inputs
            .iter()
            .enumerate()
            .rev()
            .map(|(i, s)| json!({"index": i, "embedding": [s.as_str().unwrap().len() as f32, i as f32]}))
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }

    #[tokio::test]
    async fn batches_and_preserves_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer sk-embed"))
            .and(body_partial_json(json!({"model": "text-embedding-3-small"})))
            .respond_with(echo)
            .expect(3)
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(&config(&server, 2), Credential::new("sk-embed")).unwrap();
        let texts: Vec<String> = ["a", "bb", "ccc", "dddd", "eeeee"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let vectors = client.embed(&texts).await.unwrap();

        let lens: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(lens, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[tokio::test]
    async fn http_error_is_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(&config(&server, 20), Credential::new("k")).unwrap();
        let err = client.embed_one("step 3").await.unwrap_err();
        assert!(matches!(err, PdfQaError::Embedding(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn count_mismatch_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(&config(&server, 20), Credential::new("k")).unwrap();
        let err = client.embed(&["x".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("expected 1 embeddings"));
    }
}
