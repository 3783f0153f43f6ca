use std::path::{Path, PathBuf};

use async_trait::async_trait;
use productdb_common::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::database::{Connector, Database};
use crate::ledger::{Attempt, LEDGER_TABLE, LedgerEntry, SELECT_ENTRY_SQL, UPSERT_ENTRY_SQL};

/// File-backed (or in-memory) SQLite connection, used for local runs and
/// as the real database in tests.
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening sqlite database at {}", db_path.display());
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Connection(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Connection(format!("failed to set pragmas: {e}")))?;

        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Connection(format!("failed to open in-memory database: {e}")))?;

        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn ledger_exists(&mut self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![LEDGER_TABLE],
                |row| row.get(0),
            )
            .map_err(|e| Error::Ledger(format!("failed to inspect schema: {e}")))?;
        Ok(count > 0)
    }

    async fn fetch_ledger_entry(&mut self, version: &str) -> Result<Option<LedgerEntry>> {
        self.conn
            .query_row(SELECT_ENTRY_SQL, params![version], |row| {
                Ok(LedgerEntry {
                    version: row.get(0)?,
                    description: row.get(1)?,
                    applied_at: row.get(2)?,
                    execution_time_ms: row.get(3)?,
                    success: row.get(4)?,
                })
            })
            .optional()
            .map_err(|e| Error::Ledger(format!("failed to read ledger entry {version}: {e}")))
    }

    async fn upsert_ledger_entry(&mut self, attempt: &Attempt) -> Result<()> {
        self.conn
            .execute(
                UPSERT_ENTRY_SQL,
                params![
                    attempt.version,
                    attempt.description,
                    attempt.applied_at,
                    attempt.execution_time_ms,
                    attempt.success,
                ],
            )
            .map_err(|e| {
                Error::Ledger(format!(
                    "failed to record attempt for {}: {e}",
                    attempt.version
                ))
            })?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| Error::Database(format!("failed to close database: {e}")))
    }
}

/// Opens the SQLite file at a fixed path.
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    fn target(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }

    async fn connect(&self) -> Result<Box<dyn Database>> {
        Ok(Box::new(SqliteDatabase::open(&self.path)?))
    }
}
