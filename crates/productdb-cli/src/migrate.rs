use anyhow::{Context, Result};
use productdb_config::DatabaseConfig;
use productdb_db::{
    Catalog, Database, MigrationOutcome, MigrationRunner, RunReport, collect_status,
    connect_with_retry, connector_for, render_status_table,
};
use tracing::warn;

/// Connect, apply pending migrations (or only `target`), and print the
/// report. The connection is closed on every path before returning.
pub async fn run_migrations(
    config: &DatabaseConfig,
    catalog: &Catalog,
    target: Option<&str>,
) -> Result<RunReport> {
    println!("productdb migrations");
    println!("────────────────────");
    println!("  Target:   {}", config.target());
    if let Some(version) = target {
        println!("  Version:  {version}");
    }
    println!();

    let mut db = connect(config).await?;
    let result = MigrationRunner::new(catalog).run(db.as_mut(), target).await;
    close(db).await;

    let report = result.context("migration run aborted")?;
    print!("{}", format_summary(&report));
    Ok(report)
}

/// Print the status table (or JSON) without modifying the database.
pub async fn show_status(config: &DatabaseConfig, catalog: &Catalog, json: bool) -> Result<()> {
    let mut db = connect(config).await?;
    let result = collect_status(db.as_mut(), catalog).await;
    close(db).await;

    let rows = result.context("failed to read migration status")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("Migration status ({})", config.target());
        print!("{}", render_status_table(&rows));
    }
    Ok(())
}

pub fn format_summary(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str("Migration Report\n");
    out.push_str("────────────────\n");
    for outcome in &report.outcomes {
        match outcome {
            MigrationOutcome::Applied {
                version,
                duration_ms,
            } => out.push_str(&format!("  {version}  applied ({duration_ms}ms)\n")),
            MigrationOutcome::Skipped { version } => {
                out.push_str(&format!("  {version}  already applied\n"))
            }
        }
    }
    if report.outcomes.is_empty() {
        out.push_str("  (no migrations in scope)\n");
    }
    out.push_str(&format!("  Applied:  {}\n", report.applied));
    out.push_str(&format!("  Skipped:  {}\n", report.skipped));
    out.push_str(&format!("  Duration: {}ms\n", report.elapsed.as_millis()));
    out
}

pub fn format_catalog(catalog: &Catalog) -> String {
    if catalog.is_empty() {
        return "No migrations.\n".to_string();
    }
    let mut out = format!("Migrations ({}):\n", catalog.len());
    for m in catalog.iter() {
        out.push_str(&format!("  {:<10} {}\n", m.version, m.description));
    }
    out
}

async fn connect(config: &DatabaseConfig) -> Result<Box<dyn Database>> {
    let connector = connector_for(config);
    connect_with_retry(connector.as_ref(), &config.retry)
        .await
        .with_context(|| format!("could not connect to {}", config.target()))
}

async fn close(db: Box<dyn Database>) {
    if let Err(e) = db.close().await {
        warn!("failed to close database connection: {e}");
    }
}
