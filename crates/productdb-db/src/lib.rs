pub mod bootstrap;
pub mod database;
pub mod ledger;
pub mod migrations;
pub mod postgres;
pub mod runner;
pub mod sqlite;
pub mod status;

pub use bootstrap::{connect_with_retry, connector_for};
pub use database::{Connector, Database};
pub use ledger::{Attempt, LEDGER_TABLE, LedgerEntry};
pub use migrations::{Catalog, MIGRATIONS, Migration};
pub use postgres::{PgConnector, PgDatabase};
pub use runner::{MigrationOutcome, MigrationRunner, RunReport};
pub use sqlite::{SqliteConnector, SqliteDatabase};
pub use status::{StatusRow, collect_status, render_status_table};
