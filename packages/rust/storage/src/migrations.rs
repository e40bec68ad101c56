//! SQL migration definitions for the assistant database.
//!
//! Migrations are applied in order on database open. Collection and history
//! tables are named at runtime, so they are created on demand by
//! [`crate::Storage::ensure_collection`] and
//! [`crate::Storage::ensure_history_table`] rather than here.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: schema_migrations, indexed_sources",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Which document sources each collection already holds
CREATE TABLE IF NOT EXISTS indexed_sources (
    collection    TEXT NOT NULL,
    source_url    TEXT NOT NULL,
    document_hash TEXT NOT NULL,
    chunk_count   INTEGER NOT NULL,
    indexed_at    TEXT NOT NULL,
    PRIMARY KEY (collection, source_url)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}

/// DDL for a vector collection table.
pub(crate) fn collection_ddl(name: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS "{name}" (
    id           TEXT PRIMARY KEY,
    source_url   TEXT NOT NULL,
    chunk_index  INTEGER NOT NULL,
    content      TEXT NOT NULL,
    content_hash TEXT NOT NULL UNIQUE,
    embedding    BLOB NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS "idx_{name}_source" ON "{name}"(source_url);
"#
    )
}

/// DDL for a chat history table.
pub(crate) fn history_ddl(name: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS "{name}" (
    id         TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    model      TEXT NOT NULL,
    question   TEXT NOT NULL,
    answer     TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS "idx_{name}_session" ON "{name}"(session_id, created_at);
"#
    )
}
