// src/store/sqlite.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{DispatchStore, ReplaceOutcome, StoreError};
use crate::directory::{Directory, Employee};
use crate::dispatch::{Dispatch, Window};
use crate::status::DispatchStatus;

const DISPATCH_COLUMNS: &str =
    "badge, token, dispatch_date, time_window, dispatch_at, status, created_at, validated_at";
const EMPLOYEE_COLUMNS: &str = "badge, name, title, supervisor_name, level";

/// Dispatch records and the personnel directory mirror, on one SQLite pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

// =====================
// Row helpers
// =====================

#[derive(FromRow)]
struct DispatchRow {
    badge: String,
    token: String,
    dispatch_date: NaiveDate,
    time_window: String,
    dispatch_at: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
}

impl TryFrom<DispatchRow> for Dispatch {
    type Error = StoreError;

    fn try_from(row: DispatchRow) -> Result<Self, Self::Error> {
        let corrupt = |detail: String| StoreError::CorruptRow {
            table: "dispatches",
            detail,
        };
        Ok(Dispatch {
            token: Uuid::parse_str(&row.token)
                .map_err(|e| corrupt(format!("token '{}': {}", row.token, e)))?,
            window: row.time_window.parse::<Window>().map_err(corrupt)?,
            status: row.status.parse::<DispatchStatus>().map_err(corrupt)?,
            badge: row.badge,
            date: row.dispatch_date,
            dispatch_at: row.dispatch_at,
            created_at: row.created_at,
            validated_at: row.validated_at,
        })
    }
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Private in-memory database. A single never-recycled connection keeps the data alive.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts or refreshes a directory entry, keyed by badge.
    pub async fn upsert_employee(&self, employee: &Employee, active: bool) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO employees (badge, name, title, supervisor_name, level, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(badge) DO UPDATE SET
                name = excluded.name,
                title = excluded.title,
                supervisor_name = excluded.supervisor_name,
                level = excluded.level,
                status = excluded.status",
        )
        .bind(employee.badge.trim())
        .bind(employee.name.trim())
        .bind(employee.title.as_deref())
        .bind(employee.supervisor_name.as_deref().map(str::trim))
        .bind(employee.level.as_deref())
        .bind(if active { "active" } else { "inactive" })
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn push_in_list<'a, T>(query: &mut QueryBuilder<'a, Sqlite>, values: impl IntoIterator<Item = T>)
where
    T: 'a + Send + sqlx::Encode<'a, Sqlite> + sqlx::Type<Sqlite>,
{
    query.push(" IN (");
    let mut separated = query.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
    separated.push_unseparated(")");
}

#[async_trait]
impl DispatchStore for SqliteStore {
    async fn list_for_badges(
        &self,
        badges: &[String],
        dates: &[NaiveDate],
    ) -> Result<Vec<Dispatch>, StoreError> {
        if badges.is_empty() || dates.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM dispatches WHERE badge",
            DISPATCH_COLUMNS
        ));
        push_in_list(&mut query, badges.iter().cloned());
        query.push(" AND dispatch_date");
        push_in_list(&mut query, dates.iter().copied());
        query.push(" ORDER BY badge, dispatch_date, time_window");

        let rows: Vec<DispatchRow> = query.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Dispatch::try_from).collect()
    }

    async fn replace_for_employee(
        &self,
        badge: &str,
        dates: &[NaiveDate],
        replacement: &[Dispatch],
    ) -> Result<ReplaceOutcome, StoreError> {
        // 1. transaction: dropping it before commit rolls everything back
        let mut tx = self.pool.begin().await?;

        // 2. clear the employee's period
        let deleted = if dates.is_empty() {
            0
        } else {
            let mut delete = QueryBuilder::<Sqlite>::new("DELETE FROM dispatches WHERE badge = ");
            delete.push_bind(badge.to_string());
            delete.push(" AND dispatch_date");
            push_in_list(&mut delete, dates.iter().copied());
            delete.build().execute(&mut *tx).await?.rows_affected()
        };

        // 3. insert the new set
        let mut inserted = 0;
        for dispatch in replacement {
            sqlx::query(
                "INSERT INTO dispatches
                    (badge, token, dispatch_date, time_window, dispatch_at, status,
                     created_at, validated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&dispatch.badge)
            .bind(dispatch.token.to_string())
            .bind(dispatch.date)
            .bind(dispatch.window.as_str())
            .bind(dispatch.dispatch_at)
            .bind(dispatch.status.as_str())
            .bind(dispatch.created_at)
            .bind(dispatch.validated_at)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }

        // 4. commit
        tx.commit().await?;
        debug!(
            "Replaced dispatches for {}: deleted={}, inserted={}",
            badge, deleted, inserted
        );

        Ok(ReplaceOutcome { deleted, inserted })
    }

    async fn find_by_token(&self, token: Uuid) -> Result<Option<Dispatch>, StoreError> {
        let row: Option<DispatchRow> = sqlx::query_as(&format!(
            "SELECT {} FROM dispatches WHERE token = ?1",
            DISPATCH_COLUMNS
        ))
        .bind(token.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Dispatch::try_from).transpose()
    }

    async fn record_validation(&self, token: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE dispatches SET status = ?1, validated_at = ?2
             WHERE token = ?3 AND validated_at IS NULL",
        )
        .bind(DispatchStatus::Validated.as_str())
        .bind(at)
        .bind(token.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl Directory for SqliteStore {
    async fn find_by_badge(&self, badge: &str) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>(&format!(
            "SELECT {} FROM employees WHERE badge = ?1 LIMIT 1",
            EMPLOYEE_COLUMNS
        ))
        .bind(badge.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn subordinates_of(&self, supervisor_name: &str) -> Result<Vec<Employee>, StoreError> {
        let supervisor_name = supervisor_name.trim();
        if supervisor_name.is_empty() {
            return Ok(Vec::new());
        }
        let employees = sqlx::query_as::<_, Employee>(&format!(
            "SELECT {} FROM employees
             WHERE (supervisor_name = ?1 OR name = ?1) AND status = 'active'
             ORDER BY name ASC",
            EMPLOYEE_COLUMNS
        ))
        .bind(supervisor_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(employees)
    }

    async fn count_subordinates(&self, supervisor_name: &str) -> Result<u64, StoreError> {
        let supervisor_name = supervisor_name.trim();
        if supervisor_name.is_empty() {
            return Ok(0);
        }
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE supervisor_name = ?1")
                .bind(supervisor_name)
                .fetch_one(&self.pool)
                .await?;
        Ok(total.max(0) as u64)
    }
}
