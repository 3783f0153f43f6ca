use async_trait::async_trait;
use chrono::NaiveDateTime;
use productdb_common::{Error, Result};
use productdb_config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};

use crate::database::{Connector, Database};
use crate::ledger::{Attempt, LEDGER_TABLE, LedgerEntry, SELECT_ENTRY_SQL, UPSERT_ENTRY_SQL};

type LedgerRow = (String, String, NaiveDateTime, i64, bool);

/// A single PostgreSQL session.
pub struct PgDatabase {
    conn: PgConnection,
}

impl PgDatabase {
    pub fn new(conn: PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Database for PgDatabase {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<()> {
        sqlx::Executor::execute(&mut self.conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn ledger_exists(&mut self) -> Result<bool> {
        let (present,): (bool,) = sqlx::query_as("SELECT to_regclass($1) IS NOT NULL")
            .bind(LEDGER_TABLE)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| Error::Ledger(format!("failed to inspect schema: {e}")))?;
        Ok(present)
    }

    async fn fetch_ledger_entry(&mut self, version: &str) -> Result<Option<LedgerEntry>> {
        let row: Option<LedgerRow> = sqlx::query_as(SELECT_ENTRY_SQL)
            .bind(version)
            .fetch_optional(&mut self.conn)
            .await
            .map_err(|e| Error::Ledger(format!("failed to read ledger entry {version}: {e}")))?;

        Ok(row.map(
            |(version, description, applied_at, execution_time_ms, success)| LedgerEntry {
                version,
                description,
                applied_at,
                execution_time_ms,
                success,
            },
        ))
    }

    async fn upsert_ledger_entry(&mut self, attempt: &Attempt) -> Result<()> {
        sqlx::query(UPSERT_ENTRY_SQL)
            .bind(&attempt.version)
            .bind(&attempt.description)
            .bind(attempt.applied_at)
            .bind(attempt.execution_time_ms)
            .bind(attempt.success)
            .execute(&mut self.conn)
            .await
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
            .await
            .map_err(|e| Error::Database(format!("failed to close connection: {e}")))
    }
}

/// Connects to the PostgreSQL server described by a [`DatabaseConfig`].
pub struct PgConnector {
    config: DatabaseConfig,
}

impl PgConnector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(&self.config.database)
            .username(&self.config.user)
            .password(&self.config.password)
            .application_name("productdb-migrate")
            .disable_statement_logging()
    }
}

#[async_trait]
impl Connector for PgConnector {
    fn target(&self) -> String {
        self.config.target()
    }

    async fn connect(&self) -> Result<Box<dyn Database>> {
        let conn = PgConnection::connect_with(&self.connect_options())
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(Box::new(PgDatabase::new(conn)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn connect_options_follow_config() {
        let config = DatabaseConfig {
            host: "db.internal".to_string(),
            port: 6543,
            database: "catalog".to_string(),
            user: "migrator".to_string(),
            ..DatabaseConfig::default()
        };
        let options = PgConnector::new(config).connect_options();

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("catalog"));
        assert_eq!(options.get_username(), "migrator");
    }

    #[test]
    fn target_hides_password() {
        let config = DatabaseConfig {
            password: "hunter2".to_string(),
            ..DatabaseConfig::default()
        };
        let connector = PgConnector::new(config);
        assert!(!connector.target().contains("hunter2"));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        // Port 1 on loopback is never a PostgreSQL server.
        let config = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..DatabaseConfig::default()
        };
        let connector = PgConnector::new(config);

        let result = tokio::time::timeout(Duration::from_secs(10), connector.connect())
            .await
            .expect("connect should fail fast");
        let err = result.err().expect("connect should fail");
        assert!(err.is_connection());
    }
}
