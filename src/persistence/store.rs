//! SQLite-based outcome store

use crate::core::RunStatus;
use crate::persistence::{NewOutcome, OutcomeStore, RunOutcome};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};

/// SQLite outcome store
pub struct SqliteOutcomeStore {
    pool: SqlitePool,
}

impl SqliteOutcomeStore {
    /// Open (creating if needed) the store at `db_path`
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database {}", db_path.display()))?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Default location of the results database
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("psychodrama")
            .join("results.db")
    }

    /// Create store with default path
    pub async fn with_default_path() -> Result<Self> {
        Self::new(Self::default_path()).await
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS outcomes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message TEXT NOT NULL,
                pub_date TEXT NOT NULL,
                status TEXT NOT NULL,
                duration REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to initialize outcomes table")?;

        Ok(())
    }

    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }
}

#[async_trait::async_trait]
impl OutcomeStore for SqliteOutcomeStore {
    async fn append(&self, outcome: NewOutcome) -> Result<RunOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO outcomes (message, pub_date, status, duration)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&outcome.message)
        .bind(outcome.timestamp.naive_utc())
        .bind(outcome.status.as_str())
        .bind(outcome.duration)
        .execute(&self.pool)
        .await
        .context("Failed to save outcome")?;

        Ok(outcome.with_id(result.last_insert_rowid()))
    }

    async fn list(&self, limit: usize) -> Result<Vec<RunOutcome>> {
        let rows = sqlx::query(
            r#"
            SELECT id, message, pub_date, status, duration
            FROM outcomes
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list outcomes")?;

        rows.into_iter()
            .map(|row| {
                let status: String = row.get("status");
                Ok(RunOutcome {
                    id: row.get("id"),
                    message: row.get("message"),
                    timestamp: Self::from_naive(row.get("pub_date")),
                    status: status.parse().map_err(|e: String| anyhow!(e))?,
                    duration: row.get("duration"),
                })
            })
            .collect()
    }
}
