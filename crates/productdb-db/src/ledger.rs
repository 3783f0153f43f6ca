//! The `schema_migrations` ledger: one row per attempted version.
//!
//! A version counts as done only when its row has `success = true`. Failed
//! attempts are recorded too, and a later attempt overwrites the same row, so
//! only the latest attempt per version is kept.

use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use productdb_common::Result;
use serde::Serialize;
use tracing::debug;

use crate::database::Database;
use crate::migrations::Migration;

pub const LEDGER_TABLE: &str = "schema_migrations";

pub(crate) const CREATE_LEDGER_SQL: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version VARCHAR(10) PRIMARY KEY,
    description VARCHAR(255) NOT NULL,
    applied_at TIMESTAMP NOT NULL,
    execution_time_ms BIGINT NOT NULL,
    success BOOLEAN NOT NULL DEFAULT TRUE
)";

pub(crate) const SELECT_ENTRY_SQL: &str = "SELECT version, description, applied_at, execution_time_ms, success
     FROM schema_migrations
     WHERE version = $1";

// The description keeps the text from the first attempt.
pub(crate) const UPSERT_ENTRY_SQL: &str = "INSERT INTO schema_migrations (version, description, applied_at, execution_time_ms, success)
     VALUES ($1, $2, $3, $4, $5)
     ON CONFLICT (version) DO UPDATE
     SET applied_at = EXCLUDED.applied_at,
         execution_time_ms = EXCLUDED.execution_time_ms,
         success = EXCLUDED.success";

/// A persisted ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub version: String,
    pub description: String,
    pub applied_at: NaiveDateTime,
    pub execution_time_ms: i64,
    pub success: bool,
}

impl LedgerEntry {
    pub fn execution_time(&self) -> Duration {
        Duration::from_millis(self.execution_time_ms.max(0) as u64)
    }
}

/// Write shape for one attempt at applying a migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub version: String,
    pub description: String,
    pub applied_at: NaiveDateTime,
    pub execution_time_ms: i64,
    pub success: bool,
}

impl Attempt {
    pub fn new(migration: &Migration, elapsed: Duration, success: bool) -> Self {
        Self {
            version: migration.version.to_string(),
            description: migration.description.to_string(),
            applied_at: Utc::now().naive_utc(),
            execution_time_ms: i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
            success,
        }
    }
}

/// Create the ledger table if it is missing. Safe to call on every run.
pub async fn ensure_exists(db: &mut dyn Database) -> Result<()> {
    db.execute_batch(CREATE_LEDGER_SQL).await
}

pub async fn exists(db: &mut dyn Database) -> Result<bool> {
    db.ledger_exists().await
}

pub async fn is_applied(db: &mut dyn Database, version: &str) -> Result<bool> {
    Ok(db
        .fetch_ledger_entry(version)
        .await?
        .is_some_and(|entry| entry.success))
}

pub async fn record_attempt(db: &mut dyn Database, attempt: &Attempt) -> Result<()> {
    debug!(
        "recording attempt for {}: success={}, {}ms",
        attempt.version, attempt.success, attempt.execution_time_ms
    );
    db.upsert_ledger_entry(attempt).await
}

/// Recorded execution time of the latest attempt, if any.
pub async fn duration_of(db: &mut dyn Database, version: &str) -> Result<Option<Duration>> {
    Ok(db
        .fetch_ledger_entry(version)
        .await?
        .map(|entry| entry.execution_time()))
}
