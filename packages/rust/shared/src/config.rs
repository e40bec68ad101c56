//! Application configuration for the PDF knowledge assistant.
//!
//! User config lives at `~/.pdfqa/pdfqa.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PdfQaError, Result};
use crate::types::{AssistantOptions, Credential};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pdfqa.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pdfqa";

// ---------------------------------------------------------------------------
// Config structs (matching pdfqa.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Form defaults, store names, and timeouts.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Chat model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Embedding endpoint settings.
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Text splitting and retrieval.
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// PDF URL pre-filled in the form.
    #[serde(default = "default_pdf_url")]
    pub pdf_url: String,

    /// Vector collection the documents are indexed into.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Table that stores chat history.
    #[serde(default = "default_history_table")]
    pub history_table: String,

    /// Upper bound for the indexing pass, in seconds.
    #[serde(default = "default_index_timeout")]
    pub index_timeout_secs: u64,

    /// Upper bound for answering a question, in seconds.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            pdf_url: default_pdf_url(),
            collection: default_collection(),
            history_table: default_history_table(),
            index_timeout_secs: default_index_timeout(),
            query_timeout_secs: default_query_timeout(),
        }
    }
}

fn default_pdf_url() -> String {
    "https://phi-public.s3.amazonaws.com/recipes/ThaiRecipes.pdf".into()
}
fn default_collection() -> String {
    "pdf_documents".into()
}
fn default_history_table() -> String {
    "pdf_assistants".into()
}
fn default_index_timeout() -> u64 {
    600
}
fn default_query_timeout() -> u64 {
    180
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// OpenAI-compatible API root (Groq by default).
    #[serde(default = "default_model_base_url")]
    pub base_url: String,

    /// Chat model identifier.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default = "default_true")]
    pub show_tool_calls: bool,

    #[serde(default = "default_true")]
    pub search_knowledge: bool,

    #[serde(default = "default_true")]
    pub read_chat_history: bool,

    /// Maximum model round-trips per question.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Cap on turns the model may read back from history.
    #[serde(default = "default_history_turns")]
    pub history_turns: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_model_base_url(),
            model_id: default_model_id(),
            show_tool_calls: true,
            search_knowledge: true,
            read_chat_history: true,
            max_tool_rounds: default_max_tool_rounds(),
            history_turns: default_history_turns(),
        }
    }
}

fn default_model_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_model_id() -> String {
    "mixtral-8x7b-32768".into()
}
fn default_true() -> bool {
    true
}
fn default_max_tool_rounds() -> u32 {
    5
}
fn default_history_turns() -> u32 {
    3
}

/// `[embeddings]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// OpenAI-compatible API root serving `/embeddings`.
    #[serde(default = "default_embeddings_base_url")]
    pub base_url: String,

    /// Embedding model identifier.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Name of the env var holding the embedding key (never store the key itself).
    /// When unset or empty, the submission's credential is used if the
    /// embeddings host is the chat model's host.
    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,

    /// Texts per embedding request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            base_url: default_embeddings_base_url(),
            model: default_embedding_model(),
            api_key_env: default_embedding_key_env(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_embeddings_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_embedding_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_batch_size() -> usize {
    20
}

impl EmbeddingsConfig {
    /// The key to embed with.
    ///
    /// The configured env var wins when it is set. Otherwise the submission's
    /// `fallback` credential is used, but only if the embeddings endpoint is
    /// served by the same host as the chat model at `model_base_url`; the chat
    /// key is never sent to another provider.
    ///
    /// The environment is only read here, never written.
    pub fn resolve_key(&self, fallback: &Credential, model_base_url: &str) -> Result<Credential> {
        if !self.api_key_env.is_empty() {
            if let Ok(val) = std::env::var(&self.api_key_env) {
                if !val.trim().is_empty() {
                    return Ok(Credential::new(val));
                }
            }
        }
        if same_origin(&self.base_url, model_base_url) {
            return Ok(fallback.clone());
        }
        let env = if self.api_key_env.is_empty() {
            "embeddings.api_key_env"
        } else {
            self.api_key_env.as_str()
        };
        Err(PdfQaError::config(format!("no embedding key: set {env}")))
    }
}

/// Scheme, host and port match.
fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => {
            a.scheme() == b.scheme()
                && a.host_str().is_some()
                && a.host_str() == b.host_str()
                && a.port_or_known_default() == b.port_or_known_default()
        }
        _ => false,
    }
}

/// `[chunking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks.
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    /// Passages returned per knowledge search.
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_chunk_size() -> usize {
    3000
}
fn default_overlap() -> usize {
    200
}
fn default_search_limit() -> u32 {
    5
}

// ---------------------------------------------------------------------------
// Runtime config (derived from AppConfig)
// ---------------------------------------------------------------------------

impl From<&AppConfig> for AssistantOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            model_id: config.model.model_id.clone(),
            show_tool_calls: config.model.show_tool_calls,
            search_knowledge: config.model.search_knowledge,
            read_chat_history: config.model.read_chat_history,
            max_tool_rounds: config.model.max_tool_rounds,
            history_turns: config.model.history_turns,
            search_limit: config.chunking.search_limit,
        }
    }
}

impl AppConfig {
    /// Reject values that would only fail later, mid-submission.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("model.base_url", &self.model.base_url),
            ("embeddings.base_url", &self.embeddings.base_url),
        ] {
            Url::parse(value)
                .map_err(|e| PdfQaError::config(format!("{name} '{value}' is not a URL: {e}")))?;
        }
        if self.chunking.chunk_size == 0 {
            return Err(PdfQaError::config("chunking.chunk_size must be positive"));
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(PdfQaError::config(
                "chunking.overlap must be smaller than chunking.chunk_size",
            ));
        }
        if self.embeddings.batch_size == 0 {
            return Err(PdfQaError::config("embeddings.batch_size must be positive"));
        }
        AssistantOptions::from(self).validate()
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pdfqa/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| PdfQaError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.pdfqa/pdfqa.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PdfQaError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| PdfQaError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PdfQaError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PdfQaError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PdfQaError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("pdf_documents"));
        assert!(toml_str.contains("mixtral-8x7b-32768"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let toml_str = r#"
[defaults]
collection = "recipes"

[model]
model_id = "llama-3.1-8b-instant"
show_tool_calls = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.collection, "recipes");
        assert_eq!(config.defaults.history_table, "pdf_assistants");
        assert_eq!(config.defaults.query_timeout_secs, 180);
        assert!(!config.model.show_tool_calls);
        assert!(config.model.search_knowledge);
        assert_eq!(config.chunking.chunk_size, 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn assistant_options_from_app_config() {
        let app = AppConfig::default();
        let opts = AssistantOptions::from(&app);
        assert_eq!(opts.model_id, "mixtral-8x7b-32768");
        assert!(opts.show_tool_calls && opts.search_knowledge && opts.read_chat_history);
        assert_eq!(opts.max_tool_rounds, 5);
        assert_eq!(opts.search_limit, 5);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.chunking.overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.model.base_url = "not a url".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("model.base_url"));
    }

    #[test]
    fn embedding_key_falls_back_to_credential_on_model_host() {
        let mut config = EmbeddingsConfig {
            base_url: "https://api.groq.com/openai/v1".into(),
            // Unique name so the real environment cannot interfere
            api_key_env: "PDFQA_TEST_NONEXISTENT_KEY_12345".into(),
            ..EmbeddingsConfig::default()
        };
        let fallback = Credential::new("k1");
        let key = config
            .resolve_key(&fallback, "https://api.groq.com/openai/v1")
            .unwrap();
        assert_eq!(key.expose(), "k1");

        config.api_key_env = String::new();
        let key = config
            .resolve_key(&fallback, "https://api.groq.com:443/other")
            .unwrap();
        assert_eq!(key.expose(), "k1");
    }

    #[test]
    fn embedding_key_is_not_sent_to_another_host() {
        let mut config = EmbeddingsConfig {
            api_key_env: "PDFQA_TEST_NONEXISTENT_KEY_67890".into(),
            ..EmbeddingsConfig::default()
        };
        let fallback = Credential::new("gsk_groq_secret");
        let err = config
            .resolve_key(&fallback, "https://api.groq.com/openai/v1")
            .unwrap_err();
        assert!(matches!(err, PdfQaError::Configuration { .. }));
        assert!(err.to_string().contains("PDFQA_TEST_NONEXISTENT_KEY_67890"));
        assert!(!err.to_string().contains("gsk_groq_secret"));

        config.api_key_env = String::new();
        let err = config
            .resolve_key(&fallback, "http://api.openai.com/v1")
            .unwrap_err();
        assert!(err.to_string().contains("embeddings.api_key_env"));
    }

    #[test]
    fn origins_compare_scheme_host_and_port() {
        assert!(same_origin("http://127.0.0.1:8080/v1", "http://127.0.0.1:8080"));
        assert!(!same_origin("http://127.0.0.1:8080", "http://127.0.0.1:9090"));
        assert!(!same_origin("https://api.openai.com/v1", "https://api.groq.com/openai/v1"));
        assert!(!same_origin("not a url", "not a url"));
    }
}
