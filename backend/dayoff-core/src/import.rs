// src/import.rs
//
// Loads a personnel roster CSV into the local directory table. Columns:
// badge,name,title,supervisor_name,level,status

use serde::Deserialize;
use std::io::Read;
use thiserror::Error;
use tracing::{info, warn};

use crate::directory::Employee;
use crate::store::{SqliteStore, StoreError};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
struct RosterRecord {
    badge: String,
    name: String,
    title: Option<String>,
    supervisor_name: Option<String>,
    level: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Upserts every row. Rows without badge or name are skipped; a blank status
/// counts as active.
pub async fn import_employees<R: Read>(
    store: &SqliteStore,
    reader: R,
) -> Result<ImportSummary, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut summary = ImportSummary::default();

    for (line, record) in csv_reader.deserialize::<RosterRecord>().enumerate() {
        let record = record?;
        if record.badge.is_empty() || record.name.is_empty() {
            warn!("Skipping roster row {}: badge and name are required", line + 2);
            summary.skipped += 1;
            continue;
        }

        let active = non_blank(record.status)
            .map(|s| s.eq_ignore_ascii_case("active") || s.eq_ignore_ascii_case("ativo"))
            .unwrap_or(true);
        let employee = Employee {
            badge: record.badge,
            name: record.name,
            title: non_blank(record.title),
            supervisor_name: non_blank(record.supervisor_name),
            level: non_blank(record.level),
        };
        store.upsert_employee(&employee, active).await?;
        summary.imported += 1;
    }

    info!(
        "Roster import finished: imported={}, skipped={}",
        summary.imported, summary.skipped
    );
    Ok(summary)
}
