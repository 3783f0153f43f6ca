use async_trait::async_trait;
use productdb_common::Result;

use crate::ledger::{Attempt, LedgerEntry};

/// A single live connection as seen by the migration tooling.
///
/// Transactions are driven explicitly with `begin`/`commit`/`rollback` so a
/// migration body and its ledger row can share one unit of work. None of the
/// methods retry; errors surface to the caller as-is.
#[async_trait]
pub trait Database: Send {
    /// Backend name for log lines.
    fn backend(&self) -> &'static str;

    /// Execute one or more raw statements, in order.
    async fn execute_batch(&mut self, sql: &str) -> Result<()>;

    async fn begin(&mut self) -> Result<()> {
        self.execute_batch("BEGIN").await
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute_batch("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.execute_batch("ROLLBACK").await
    }

    /// Whether the ledger table is present.
    async fn ledger_exists(&mut self) -> Result<bool>;

    async fn fetch_ledger_entry(&mut self, version: &str) -> Result<Option<LedgerEntry>>;

    /// Insert or overwrite the ledger row for `attempt.version`.
    async fn upsert_ledger_entry(&mut self, attempt: &Attempt) -> Result<()>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens new connections to one configured target.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connection target without credentials.
    fn target(&self) -> String;

    async fn connect(&self) -> Result<Box<dyn Database>>;
}
