//! Connection bootstrap with a fixed-delay retry budget.
//!
//! The database may still be starting when the migration job launches (a
//! container that is scheduled alongside it, for example), so the first
//! connection is retried with a constant delay until the configured attempt
//! ceiling. Once connected, nothing downstream retries.

use productdb_common::{Error, Result};
use productdb_config::{DatabaseConfig, Driver, RetryPolicy};
use tracing::{info, warn};

use crate::database::{Connector, Database};
use crate::postgres::PgConnector;
use crate::sqlite::SqliteConnector;

/// Pick the connector matching the configured driver.
pub fn connector_for(config: &DatabaseConfig) -> Box<dyn Connector> {
    match config.driver {
        Driver::Postgres => Box::new(PgConnector::new(config.clone())),
        Driver::Sqlite => Box::new(SqliteConnector::new(config.sqlite_path())),
    }
}

/// Connect, retrying up to `policy.attempts()` times with `policy.delay`
/// between attempts. The error after the last attempt carries the last
/// underlying failure. Errors that are not connection failures are returned
/// at once.
pub async fn connect_with_retry(
    connector: &dyn Connector,
    policy: &RetryPolicy,
) -> Result<Box<dyn Database>> {
    let max_attempts = policy.attempts();
    let target = connector.target();
    let mut attempt = 1;

    loop {
        info!("connecting to {target} (attempt {attempt}/{max_attempts})");
        match connector.connect().await {
            Ok(db) => {
                info!("connected to {target} ({})", db.backend());
                return Ok(db);
            }
            Err(e) if !e.is_connection() => {
                warn!("connecting to {target} failed without a retryable cause: {e}");
                return Err(e);
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    "connection attempt {attempt}/{max_attempts} failed: {e}, retrying in {}ms",
                    policy.delay.as_millis()
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!("connection attempt {attempt}/{max_attempts} failed: {e}");
                return Err(Error::ConnectionExhausted {
                    attempts: attempt,
                    last_error: e.to_string(),
                });
            }
        }
    }
}
