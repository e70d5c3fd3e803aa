//! Support staging and database initialization
//!
//! Relative paths in the descriptor resolve against the working copy.

use crate::core::{DatabaseConfig, SupportDirective};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while staging files or initializing the database
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Database {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StagingError + '_ {
    move |source| StagingError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A declared support root, removed with everything under it when dropped
#[derive(Debug)]
pub struct SupportRoot {
    path: PathBuf,
}

impl SupportRoot {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SupportRoot {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "removed support root"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "failed to remove support root: {}", e),
        }
    }
}

/// Apply support directives in listed order
///
/// Returns a guard for each declared support root. Keep the guards alive for
/// the duration of phase execution; dropping them removes the roots.
pub fn apply_support(base: &Path, directives: &[SupportDirective]) -> Result<Vec<SupportRoot>, StagingError> {
    let mut roots = Vec::new();

    for directive in directives {
        match directive {
            SupportDirective::WriteFile { path, text } => {
                let path = base.join(path);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(io_error(parent))?;
                }
                std::fs::write(&path, text).map_err(io_error(&path))?;
                debug!(path = %path.display(), "wrote support file");
            }
            SupportDirective::Directory { path } => {
                let path = base.join(path);
                std::fs::create_dir_all(&path).map_err(io_error(&path))?;
                debug!(path = %path.display(), "created support directory");
            }
            SupportDirective::Root { root } => {
                let path = base.join(root);
                std::fs::create_dir_all(&path).map_err(io_error(&path))?;
                debug!(path = %path.display(), "declared support root");
                roots.push(SupportRoot { path });
            }
        }
    }

    Ok(roots)
}

/// Split a SQL string into its individual `;`-separated statements
pub fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

/// Drop and recreate the database file, then run its statements in order
pub async fn init_database(base: &Path, database: &DatabaseConfig) -> Result<PathBuf, StagingError> {
    let path = base.join(&database.path);

    match tokio::fs::remove_file(&path).await {
        Ok(()) => debug!(path = %path.display(), "removed previous database"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_error(&path)(e)),
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_error(parent))?;
    }

    let db_error = |source: sqlx::Error| StagingError::Database {
        path: path.clone(),
        source,
    };

    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&options).await.map_err(db_error)?;

    let mut executed = 0usize;
    for statement in database.sql.iter().flat_map(|sql| split_statements(sql)) {
        sqlx::query(statement)
            .execute(&mut conn)
            .await
            .map_err(db_error)?;
        executed += 1;
    }
    conn.close().await.map_err(db_error)?;

    info!(path = %path.display(), statements = executed, "initialized database");
    Ok(path)
}
