//! Persistence layer for run outcomes

pub mod store;

pub use store::SqliteOutcomeStore;

use crate::core::RunStatus;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// One finished run, as recorded by the reporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Store-assigned identifier, strictly increasing
    pub id: i64,

    /// Terminating message of the run
    pub message: String,

    /// When the outcome was recorded
    pub timestamp: DateTime<Utc>,

    pub status: RunStatus,

    /// Elapsed wall-clock time of the run in seconds
    pub duration: f64,
}

impl RunOutcome {
    /// Duration rendered to one decimal place
    pub fn formatted_duration(&self) -> String {
        format!("{:.1}", self.duration)
    }
}

/// Outcome fields supplied by the reporter; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutcome {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub status: RunStatus,
    pub duration: f64,
}

impl NewOutcome {
    fn with_id(self, id: i64) -> RunOutcome {
        RunOutcome {
            id,
            message: self.message,
            timestamp: self.timestamp,
            status: self.status,
            duration: self.duration,
        }
    }
}

/// Trait for outcome stores
#[async_trait::async_trait]
pub trait OutcomeStore: Send + Sync {
    /// Append an outcome, assigning the next id atomically
    async fn append(&self, outcome: NewOutcome) -> Result<RunOutcome>;

    /// Most recent outcomes first, at most `limit`
    async fn list(&self, limit: usize) -> Result<Vec<RunOutcome>>;
}

/// In-memory outcome store (for testing or ephemeral use)
#[derive(Default)]
pub struct InMemoryOutcomeStore {
    outcomes: tokio::sync::RwLock<Vec<RunOutcome>>,
}

impl InMemoryOutcomeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl OutcomeStore for InMemoryOutcomeStore {
    async fn append(&self, outcome: NewOutcome) -> Result<RunOutcome> {
        let mut outcomes = self.outcomes.write().await;
        let id = outcomes.iter().map(|o| o.id).max().unwrap_or(0) + 1;
        let outcome = outcome.with_id(id);
        outcomes.push(outcome.clone());
        Ok(outcome)
    }

    async fn list(&self, limit: usize) -> Result<Vec<RunOutcome>> {
        let outcomes = self.outcomes.read().await;
        Ok(outcomes.iter().rev().take(limit).cloned().collect())
    }
}

/// Records the outcome of every run
///
/// Reporting never fails a run: store errors are logged and swallowed.
#[derive(Clone)]
pub struct Reporter {
    store: Arc<dyn OutcomeStore>,
}

impl Reporter {
    pub fn new(store: Arc<dyn OutcomeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn OutcomeStore> {
        &self.store
    }

    /// Append an outcome whose duration runs from `started_at` until now
    pub async fn report(&self, message: &str, status: RunStatus, started_at: Instant) -> Option<RunOutcome> {
        let outcome = NewOutcome {
            message: message.to_string(),
            timestamp: Utc::now(),
            status,
            duration: started_at.elapsed().as_secs_f64(),
        };

        match self.store.append(outcome).await {
            Ok(outcome) => {
                info!(
                    id = outcome.id,
                    status = %outcome.status,
                    duration = %outcome.formatted_duration(),
                    "recorded run outcome: {}", outcome.message
                );
                Some(outcome)
            }
            Err(e) => {
                error!("failed to record run outcome '{}': {:#}", message, e);
                None
            }
        }
    }
}
