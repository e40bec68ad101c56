//! Chat history handle over a libSQL table.

use pdfqa_shared::{ChatTurn, Result, SessionId, SessionSummary};
use pdfqa_storage::{Storage, validate_identifier};

use crate::collaborators::HistoryStore;

/// Assistant history stored in one named table.
pub struct LibsqlHistory {
    storage: Storage,
    table: String,
}

impl LibsqlHistory {
    /// Bind to `table`, creating it if needed.
    pub async fn open(storage: Storage, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        storage.ensure_history_table(&table).await?;
        Ok(Self { storage, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Every session in the table, most recently active first.
    pub async fn sessions(&self) -> Result<Vec<SessionSummary>> {
        self.storage.list_sessions(&self.table).await
    }
}

impl HistoryStore for LibsqlHistory {
    async fn recent_turns(&self, session: &SessionId, limit: usize) -> Result<Vec<ChatTurn>> {
        self.storage
            .recent_turns(&self.table, &session.to_string(), limit)
            .await
    }

    async fn append_turn(&self, turn: &ChatTurn) -> Result<()> {
        self.storage.append_turn(&self.table, turn).await
    }
}
