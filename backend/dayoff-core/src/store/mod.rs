// src/store/mod.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::dispatch::Dispatch;

pub mod sqlite;

pub use sqlite::SqliteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Corrupt row in {table}: {detail}")]
    CorruptRow { table: &'static str, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceOutcome {
    pub deleted: u64,
    pub inserted: u64,
}

/// Persistent home of dispatch records.
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Every dispatch for the given badges whose date is one of `dates`.
    async fn list_for_badges(
        &self,
        badges: &[String],
        dates: &[NaiveDate],
    ) -> Result<Vec<Dispatch>, StoreError>;

    /// Deletes every dispatch of `badge` dated in `dates` and inserts `replacement`,
    /// as one unit: on error nothing changes.
    async fn replace_for_employee(
        &self,
        badge: &str,
        dates: &[NaiveDate],
        replacement: &[Dispatch],
    ) -> Result<ReplaceOutcome, StoreError>;

    async fn find_by_token(&self, token: Uuid) -> Result<Option<Dispatch>, StoreError>;

    /// Marks a dispatch validated at `at`. Returns false when the token is unknown or
    /// the dispatch already carries a validation.
    async fn record_validation(&self, token: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError>;
}
