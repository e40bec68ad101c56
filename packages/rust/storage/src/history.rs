//! Chat history tables.

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::params;
use pdfqa_shared::{ChatTurn, PdfQaError, Result, SessionSummary};

use crate::{Storage, db_err, migrations, validate_identifier};

impl Storage {
    /// Create the history table if it does not exist.
    pub async fn ensure_history_table(&self, table: &str) -> Result<()> {
        validate_identifier(table)?;
        self.conn
            .execute_batch(&migrations::history_ddl(table))
            .await
            .map_err(db_err)?;
        Ok(())
    }

    pub async fn append_turn(&self, table: &str, turn: &ChatTurn) -> Result<()> {
        validate_identifier(table)?;
        self.conn
            .execute(
                &format!(
                    r#"INSERT INTO "{table}" (id, session_id, model, question, answer, created_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#
                ),
                params![
                    turn.id.as_str(),
                    turn.session_id.as_str(),
                    turn.model.as_str(),
                    turn.question.as_str(),
                    turn.answer.as_str(),
                    turn.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// The last `limit` turns of a session, oldest first.
    pub async fn recent_turns(
        &self,
        table: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatTurn>> {
        validate_identifier(table)?;
        if limit == 0 || !self.table_exists(table).await? {
            return Ok(Vec::new());
        }
        let mut rows = self
            .conn
            .query(
                &format!(
                    r#"SELECT id, session_id, model, question, answer, created_at FROM "{table}"
                       WHERE session_id = ?1
                       ORDER BY created_at DESC, id DESC
                       LIMIT ?2"#
                ),
                params![session_id, limit as i64],
            )
            .await
            .map_err(db_err)?;

        let mut turns = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            turns.push(row_to_turn(&row)?);
        }
        turns.reverse();
        Ok(turns)
    }

    /// All sessions in the table, most recently active first.
    pub async fn list_sessions(&self, table: &str) -> Result<Vec<SessionSummary>> {
        validate_identifier(table)?;
        if !self.table_exists(table).await? {
            return Ok(Vec::new());
        }
        let mut rows = self
            .conn
            .query(
                &format!(
                    r#"SELECT session_id, COUNT(*), MAX(created_at) FROM "{table}"
                       GROUP BY session_id
                       ORDER BY MAX(created_at) DESC"#
                ),
                params![],
            )
            .await
            .map_err(db_err)?;

        let mut sessions = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            sessions.push(SessionSummary {
                session_id: row.get::<String>(0).map_err(db_err)?,
                turns: row.get::<i64>(1).map_err(db_err)? as usize,
                last_activity: parse_timestamp(&row.get::<String>(2).map_err(db_err)?)?,
            });
        }
        Ok(sessions)
    }
}

fn row_to_turn(row: &libsql::Row) -> Result<ChatTurn> {
    Ok(ChatTurn {
        id: row.get::<String>(0).map_err(db_err)?,
        session_id: row.get::<String>(1).map_err(db_err)?,
        model: row.get::<String>(2).map_err(db_err)?,
        question: row.get::<String>(3).map_err(db_err)?,
        answer: row.get::<String>(4).map_err(db_err)?,
        created_at: parse_timestamp(&row.get::<String>(5).map_err(db_err)?)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PdfQaError::Storage(format!("bad timestamp '{raw}': {e}")))
}
