//! PDF download, text extraction, and chunking.
//!
//! [`PdfReader`] turns a document URL into [`DocumentChunk`]s ready to embed:
//! it downloads the bytes (refusing private and non-HTTP targets), extracts
//! text with `pdf-extract` on a blocking thread, and splits it with
//! [`chunk_text`].

mod chunk;
mod guard;

use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::{debug, info, instrument};
use url::Url;

use pdfqa_shared::{ChunkingConfig, DocumentChunk, PdfQaError, Result, content_hash};

pub use chunk::chunk_text;

/// User-Agent string for document downloads.
const USER_AGENT: &str = concat!("pdfqa/", env!("CARGO_PKG_VERSION"));

const MAX_REDIRECTS: usize = 5;

/// A downloaded, extracted and chunked document.
#[derive(Debug, Clone)]
pub struct ReadDocument {
    pub source_url: String,
    /// SHA-256 of the downloaded bytes.
    pub document_hash: String,
    pub chunks: Vec<DocumentChunk>,
}

/// Downloads PDFs over HTTP and splits their text into chunks.
#[derive(Debug, Clone)]
pub struct PdfReader {
    client: Client,
    chunk_size: usize,
    overlap: usize,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_localhost: bool,
}

impl PdfReader {
    pub fn new(chunking: &ChunkingConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(false)?,
            chunk_size: chunking.chunk_size,
            overlap: chunking.overlap,
            allow_localhost: false,
        })
    }

    /// Allow fetching from localhost/private IPs, including via redirects.
    pub fn allow_localhost(mut self) -> Result<Self> {
        self.client = build_client(true)?;
        self.allow_localhost = true;
        Ok(self)
    }

    /// Download, extract, and chunk the document at `source_url`.
    #[instrument(skip_all, fields(source_url = %source_url))]
    pub async fn read(&self, source_url: &str) -> Result<ReadDocument> {
        let bytes = self.fetch(source_url).await?;
        let document_hash = content_hash(&bytes);
        let text = extract_text(bytes).await?;

        let chunks: Vec<DocumentChunk> = chunk_text(&text, self.chunk_size, self.overlap)
            .into_iter()
            .enumerate()
            .map(|(i, content)| DocumentChunk::new(source_url, i, content))
            .collect();

        info!(chars = text.len(), chunks = chunks.len(), "document read");
        Ok(ReadDocument {
            source_url: source_url.to_string(),
            document_hash,
            chunks,
        })
    }

    /// Download the raw document bytes.
    pub async fn fetch(&self, source_url: &str) -> Result<Vec<u8>> {
        let url = Url::parse(source_url)
            .map_err(|e| PdfQaError::parse(format!("invalid PDF URL '{source_url}': {e}")))?;

        if !self.allow_localhost && guard::is_ssrf_target(&url) {
            return Err(PdfQaError::Network(format!(
                "{url}: refusing to fetch from a local or non-HTTP address"
            )));
        }

        debug!(%url, "downloading document");
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| PdfQaError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PdfQaError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PdfQaError::Network(format!("{url}: body read failed: {e}")))?;
        debug!(bytes = body.len(), "document downloaded");
        Ok(body.to_vec())
    }
}

fn build_client(allow_localhost: bool) -> Result<Client> {
    let policy = Policy::custom(move |attempt| {
        match redirect_refusal(attempt.url(), attempt.previous().len(), allow_localhost) {
            Some(reason) => attempt.error(reason),
            None => attempt.follow(),
        }
    });
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(policy)
        .timeout(Duration::from_secs(120))
        .build()
        .map_err(|e| PdfQaError::Network(format!("failed to build HTTP client: {e}")))
}

/// Why a redirect to `target` must not be followed, if it must not.
///
/// Every hop gets the same address check as the requested URL.
fn redirect_refusal(target: &Url, hops: usize, allow_localhost: bool) -> Option<String> {
    if hops >= MAX_REDIRECTS {
        return Some(format!("more than {MAX_REDIRECTS} redirects"));
    }
    if !allow_localhost && guard::is_ssrf_target(target) {
        return Some(format!(
            "redirect to {target} refused: local or non-HTTP address"
        ));
    }
    None
}

/// Extract plain text from PDF bytes.
///
/// Runs on the blocking pool. A document with no extractable text is a
/// parse error.
pub async fn extract_text(bytes: Vec<u8>) -> Result<String> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| PdfQaError::parse(format!("PDF extraction aborted: {e}")))?
        .map_err(|e| PdfQaError::parse(format!("PDF parse error: {e}")))?;

    if text.trim().is_empty() {
        return Err(PdfQaError::parse("PDF contains no extractable text"));
    }
    Ok(text)
}
