//! libSQL storage layer for vector collections and chat history.
//!
//! The [`Storage`] struct wraps a libSQL database (local file, in-memory, or
//! remote server) that holds:
//! - vector collections: one table per collection of embedded chunks
//! - `indexed_sources`: which document sources each collection already holds
//! - chat history tables: one table per assistant history store

mod address;
mod collection;
mod history;
mod migrations;

use libsql::{Connection, Database, params};
use pdfqa_shared::{PdfQaError, Result};

pub use address::{StoreAddress, validate_identifier};
pub use collection::{bytes_to_embedding, cosine_similarity, embedding_to_bytes};

/// How long a local connection waits on another writer's lock.
const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    address: StoreAddress,
}

impl Storage {
    /// Parse `raw` as a [`StoreAddress`] and open it.
    pub async fn connect(raw: &str) -> Result<Self> {
        let address = StoreAddress::parse(raw)?;
        Self::open(&address).await
    }

    /// Open or create the database at `address` and apply migrations.
    pub async fn open(address: &StoreAddress) -> Result<Self> {
        let db = match address {
            StoreAddress::Local(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| PdfQaError::io(parent, e))?;
                }
                libsql::Builder::new_local(path).build().await
            }
            StoreAddress::Memory => libsql::Builder::new_local(":memory:").build().await,
            StoreAddress::Remote { url, auth_token } => {
                libsql::Builder::new_remote(url.clone(), auth_token.clone())
                    .build()
                    .await
            }
        }
        .map_err(|e| PdfQaError::Storage(format!("cannot open {address}: {e}")))?;

        let conn = db.connect().map_err(db_err)?;
        if matches!(address, StoreAddress::Local(_)) {
            // Wait for other processes' write locks instead of failing at once.
            let mut rows = conn
                .query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"), params![])
                .await
                .map_err(db_err)?;
            rows.next().await.map_err(db_err)?;
        }

        let storage = Self {
            db,
            conn,
            address: address.clone(),
        };
        storage.run_migrations().await?;
        tracing::debug!(%address, "storage opened");
        Ok(storage)
    }

    /// The address this handle was opened from.
    pub fn address(&self) -> &StoreAddress {
        &self.address
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    PdfQaError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }
}

/// Map a libSQL error into the storage error kind.
pub(crate) fn db_err(e: libsql::Error) -> PdfQaError {
    PdfQaError::Storage(e.to_string())
}
