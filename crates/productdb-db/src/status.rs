//! Read-only status view: the catalog joined against the ledger.

use std::fmt::Write;
use std::time::Duration;

use productdb_common::Result;
use serde::Serialize;
use tracing::info;

use crate::database::Database;
use crate::ledger;
use crate::migrations::Catalog;

const DESCRIPTION_WIDTH: usize = 39;
const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub version: String,
    pub description: String,
    pub applied: bool,
    pub duration_ms: Option<u64>,
}

impl StatusRow {
    pub fn duration_label(&self) -> String {
        match self.duration_ms {
            Some(ms) if self.applied => format!("{ms}ms"),
            _ => PLACEHOLDER.to_string(),
        }
    }
}

/// Look up every catalog entry in the ledger, in catalog order.
///
/// Never writes. A database that has never been migrated has no ledger
/// table yet; every entry is then reported as pending.
pub async fn collect_status(db: &mut dyn Database, catalog: &Catalog) -> Result<Vec<StatusRow>> {
    let ledger_present = ledger::exists(db).await?;
    if !ledger_present {
        info!("no {} table found, reporting all migrations as pending", ledger::LEDGER_TABLE);
    }

    let mut rows = Vec::with_capacity(catalog.len());
    for migration in catalog.iter() {
        let applied = ledger_present && ledger::is_applied(db, migration.version).await?;
        let duration = if applied {
            ledger::duration_of(db, migration.version).await?
        } else {
            None
        };

        rows.push(StatusRow {
            version: migration.version.to_string(),
            description: migration.description.to_string(),
            applied,
            duration_ms: duration.map(duration_ms),
        });
    }
    Ok(rows)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Render rows as a boxed text table.
pub fn render_status_table(rows: &[StatusRow]) -> String {
    let rule = |left: char, mid: char, right: char| {
        format!(
            "{left}{}{mid}{}{mid}{}{mid}{}{right}\n",
            "─".repeat(10),
            "─".repeat(DESCRIPTION_WIDTH + 2),
            "─".repeat(11),
            "─".repeat(10),
        )
    };

    let mut out = String::new();
    out.push_str(&rule('┌', '┬', '┐'));
    let _ = writeln!(
        out,
        "│ {:<8} │ {:<width$} │ {:<9} │ {:<8} │",
        "Version",
        "Description",
        "Status",
        "Duration",
        width = DESCRIPTION_WIDTH
    );
    out.push_str(&rule('├', '┼', '┤'));
    for row in rows {
        let _ = writeln!(
            out,
            "│ {:<8} │ {:<width$} │ {:<9} │ {:<8} │",
            row.version,
            truncate(&row.description, DESCRIPTION_WIDTH),
            if row.applied { "applied" } else { "pending" },
            row.duration_label(),
            width = DESCRIPTION_WIDTH
        );
    }
    out.push_str(&rule('└', '┴', '┘'));
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
