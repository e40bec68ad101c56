//! One form submission, end to end: validate → build handles → index → answer.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use pdfqa_shared::{
    Answer, AppConfig, AssistantOptions, Credential, IndexOutcome, PdfQaError, Result,
    SessionInput, Stage,
};

use crate::collaborators::{Assistant, Collaborators, KnowledgeBase};

/// Phase name shown while the document is being indexed.
pub const LOADING_PHASE: &str = "Loading knowledge base...";
/// Phase name shown while the assistant is answering.
pub const QUERY_PHASE: &str = "Processing your query...";

/// Progress callback for reporting submission status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after indexing finishes.
    fn indexed(&self, _outcomes: &[IndexOutcome]) {}
    /// Called when the answer is ready.
    fn done(&self, _answer: &Answer) {}
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
}

/// Store names, assistant behaviour, and time budgets for submissions.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub collection: String,
    pub history_table: String,
    pub options: AssistantOptions,
    pub index_timeout: Duration,
    pub query_timeout: Duration,
    /// Ask the model for an SSE stream instead of a single response.
    pub stream: bool,
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            collection: config.defaults.collection.clone(),
            history_table: config.defaults.history_table.clone(),
            options: AssistantOptions::from(config),
            index_timeout: Duration::from_secs(config.defaults.index_timeout_secs),
            query_timeout: Duration::from_secs(config.defaults.query_timeout_secs),
            stream: false,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Runs submissions against a set of collaborators.
///
/// Holds no per-submission state, so one orchestrator can serve overlapping
/// submissions with different credentials.
pub struct QueryOrchestrator<C> {
    collaborators: C,
    settings: OrchestratorSettings,
}

impl<C: Collaborators> QueryOrchestrator<C> {
    pub fn new(collaborators: C, settings: OrchestratorSettings) -> Self {
        Self {
            collaborators,
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn collaborators(&self) -> &C {
        &self.collaborators
    }

    /// Answer one submission without progress reporting.
    pub async fn handle_submission(&self, input: SessionInput) -> Result<Answer> {
        self.handle_submission_with(input, &SilentProgress).await
    }

    /// Answer one submission.
    ///
    /// 1. Validate that all four fields are filled
    /// 2. Build the knowledge, history, and assistant handles
    /// 3. Index the document (never recreating) under the index timeout
    /// 4. Run the question under the query timeout
    #[instrument(skip_all, fields(source = %input.document_source))]
    pub async fn handle_submission_with(
        &self,
        input: SessionInput,
        progress: &dyn ProgressReporter,
    ) -> Result<Answer> {
        let start = Instant::now();
        input.validate()?;

        let session_id = input.session_id.clone().unwrap_or_default();
        info!(%session_id, "handling submission");

        let knowledge = self
            .collaborators
            .knowledge(
                &input.credential,
                &input.storage_address,
                vec![input.document_source.clone()],
                &self.settings.collection,
            )
            .await
            .map_err(|e| e.during(Stage::Construction))?;
        let knowledge = Arc::new(knowledge);

        let history = self
            .collaborators
            .history(&input.storage_address, &self.settings.history_table)
            .await
            .map_err(|e| e.during(Stage::Construction))?;

        let assistant = self
            .collaborators
            .assistant(
                Arc::clone(&knowledge),
                history,
                self.settings.options.clone(),
                &input.credential,
                session_id.clone(),
            )
            .map_err(|e| e.during(Stage::Construction))?;

        progress.phase(LOADING_PHASE);
        let index = within(
            Stage::Indexing,
            self.settings.index_timeout,
            knowledge.ensure_indexed(false),
        )
        .await?;
        progress.indexed(&index);

        progress.phase(QUERY_PHASE);
        let text = within(
            Stage::Query,
            self.settings.query_timeout,
            assistant.run(&input.question, self.settings.stream),
        )
        .await?;

        let answer = Answer {
            text,
            session_id,
            index,
            elapsed: start.elapsed(),
        };
        info!(elapsed_ms = answer.elapsed.as_millis() as u64, "submission answered");
        progress.done(&answer);
        Ok(answer)
    }

    /// Index a document without asking anything.
    #[instrument(skip_all, fields(source = %document_source, force_recreate))]
    pub async fn index_document(
        &self,
        credential: &Credential,
        storage_address: &str,
        document_source: &str,
        force_recreate: bool,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<IndexOutcome>> {
        // No question is asked here, so only the first three fields can be missing.
        SessionInput::new(credential.expose(), storage_address, document_source, "-")
            .validate()?;

        let knowledge = self
            .collaborators
            .knowledge(
                credential,
                storage_address,
                vec![document_source.to_string()],
                &self.settings.collection,
            )
            .await
            .map_err(|e| e.during(Stage::Construction))?;

        progress.phase(LOADING_PHASE);
        let outcomes = within(
            Stage::Indexing,
            self.settings.index_timeout,
            knowledge.ensure_indexed(force_recreate),
        )
        .await?;
        progress.indexed(&outcomes);
        Ok(outcomes)
    }
}

/// Await `fut` for at most `after`, attributing failures to `stage`.
async fn within<T>(
    stage: Stage,
    after: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result.map_err(|e| e.during(stage)),
        Err(_) => Err(PdfQaError::Timeout { stage, after }),
    }
}
