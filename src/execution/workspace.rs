//! Working copies of triggering repositories

use crate::core::RepositoryInfo;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Errors raised while preparing a working copy
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("repository '{0}' has no clone URL")]
    MissingUrl(String),

    #[error("failed to execute git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git {args} failed: {stderr}")]
    Git { args: String, stderr: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Provides the working copy a run executes in
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Bring the working copy of `repository` to `branch` and return its path
    async fn prepare(&self, repository: &RepositoryInfo, branch: &str) -> Result<PathBuf, SourceError>;
}

/// Uses one fixed directory as the working copy, untouched
#[derive(Debug, Clone)]
pub struct StaticSource {
    path: PathBuf,
}

impl StaticSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SourceProvider for StaticSource {
    async fn prepare(&self, repository: &RepositoryInfo, branch: &str) -> Result<PathBuf, SourceError> {
        debug!(repository = %repository.name, branch, path = %self.path.display(), "using static working copy");
        Ok(self.path.clone())
    }
}

/// Git working copies kept under one root, one directory per repository
#[derive(Debug, Clone)]
pub struct GitWorkingCopies {
    root: PathBuf,
}

impl GitWorkingCopies {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the working copy of `repository`
    pub fn path_for(&self, repository: &RepositoryInfo) -> PathBuf {
        self.root.join(&repository.name)
    }
}

#[async_trait]
impl SourceProvider for GitWorkingCopies {
    async fn prepare(&self, repository: &RepositoryInfo, branch: &str) -> Result<PathBuf, SourceError> {
        let path = self.path_for(repository);

        if !path.join(".git").is_dir() {
            let url = repository
                .clone_url()
                .ok_or_else(|| SourceError::MissingUrl(repository.name.clone()))?;
            tokio::fs::create_dir_all(&self.root)
                .await
                .map_err(|source| SourceError::Io {
                    path: self.root.clone(),
                    source,
                })?;
            let dest = path.to_string_lossy();
            git(&self.root, &["clone", url, &dest]).await?;
            info!(repository = %repository.name, url, "cloned repository");
        } else {
            git(&path, &["fetch", "origin"]).await?;
        }

        if git(&path, &["checkout", branch]).await.is_err() {
            git(&path, &["checkout", "-b", branch]).await?;
        }
        git(&path, &["pull", "origin", branch]).await?;

        info!(repository = %repository.name, branch, "working copy ready");
        Ok(path)
    }
}

async fn git(dir: &Path, args: &[&str]) -> Result<(), SourceError> {
    debug!(dir = %dir.display(), "git {}", args.join(" "));

    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(SourceError::Spawn)?;

    if output.status.success() {
        Ok(())
    } else {
        Err(SourceError::Git {
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
