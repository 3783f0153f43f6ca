use std::time::{Duration, Instant};

use productdb_common::{Error, Result};
use tracing::{info, warn};

use crate::database::Database;
use crate::ledger::{self, Attempt};
use crate::migrations::{Catalog, Migration};

/// What happened to one catalog entry during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Applied { version: String, duration_ms: u64 },
    Skipped { version: String },
}

impl MigrationOutcome {
    pub fn version(&self) -> &str {
        match self {
            Self::Applied { version, .. } | Self::Skipped { version } => version,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub applied: usize,
    pub skipped: usize,
    pub outcomes: Vec<MigrationOutcome>,
    pub elapsed: Duration,
}

/// Applies pending catalog entries, one transaction per migration.
///
/// Each body runs in its own transaction together with its ledger row, so a
/// migration and the record of it commit or vanish as one. The first failure
/// stops the run; migrations committed before it stay committed.
pub struct MigrationRunner<'a> {
    catalog: &'a Catalog,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Apply every pending migration, or only `target` when given.
    pub async fn run(&self, db: &mut dyn Database, target: Option<&str>) -> Result<RunReport> {
        let started = Instant::now();

        if let Some(version) = target {
            if self.catalog.get(version).is_none() {
                warn!("migration {version} is not in the catalog, nothing to do");
                return Ok(RunReport {
                    applied: 0,
                    skipped: 0,
                    outcomes: Vec::new(),
                    elapsed: started.elapsed(),
                });
            }
        }

        ledger::ensure_exists(db).await?;

        let mut outcomes = Vec::new();
        for migration in self.catalog.iter() {
            if target.is_some_and(|version| version != migration.version) {
                continue;
            }

            if ledger::is_applied(db, migration.version).await? {
                info!(
                    "migration {}: already applied ({})",
                    migration.version, migration.description
                );
                outcomes.push(MigrationOutcome::Skipped {
                    version: migration.version.to_string(),
                });
                continue;
            }

            info!(
                "migration {}: applying ({})",
                migration.version, migration.description
            );
            let duration = self.apply(db, migration).await?;
            info!(
                "migration {}: applied in {}ms",
                migration.version,
                duration.as_millis()
            );
            outcomes.push(MigrationOutcome::Applied {
                version: migration.version.to_string(),
                duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            });
        }

        let applied = outcomes
            .iter()
            .filter(|o| matches!(o, MigrationOutcome::Applied { .. }))
            .count();

        Ok(RunReport {
            applied,
            skipped: outcomes.len() - applied,
            outcomes,
            elapsed: started.elapsed(),
        })
    }

    async fn apply(&self, db: &mut dyn Database, migration: &Migration) -> Result<Duration> {
        db.begin().await?;

        let started = Instant::now();
        let body = db.execute_batch(migration.sql).await;
        let elapsed = started.elapsed();

        if let Err(e) = body {
            warn!("migration {}: failed: {e}", migration.version);
            if let Err(rollback_err) = db.rollback().await {
                warn!(
                    "migration {}: rollback failed: {rollback_err}",
                    migration.version
                );
            }
            self.record_failure(db, migration, elapsed).await;
            return Err(Error::Migration {
                version: migration.version.to_string(),
                message: e.to_string(),
            });
        }

        let committed = async {
            ledger::record_attempt(db, &Attempt::new(migration, elapsed, true)).await?;
            db.commit().await
        }
        .await;

        if let Err(e) = committed {
            if let Err(rollback_err) = db.rollback().await {
                warn!(
                    "migration {}: rollback failed: {rollback_err}",
                    migration.version
                );
            }
            return Err(e);
        }

        Ok(elapsed)
    }

    /// Record a failed attempt in its own transaction. Errors here are
    /// logged and dropped so they never replace the migration's own error.
    async fn record_failure(&self, db: &mut dyn Database, migration: &Migration, elapsed: Duration) {
        let attempt = Attempt::new(migration, elapsed, false);
        let recorded = async {
            db.begin().await?;
            ledger::record_attempt(db, &attempt).await?;
            db.commit().await
        }
        .await;

        if let Err(e) = recorded {
            warn!(
                "migration {}: could not record failed attempt: {e}",
                migration.version
            );
            if let Err(rollback_err) = db.rollback().await {
                warn!(
                    "migration {}: rollback after failed record failed: {rollback_err}",
                    migration.version
                );
            }
        }
    }
}
