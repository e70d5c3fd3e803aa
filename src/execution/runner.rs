//! Top-level run algorithm
//!
//! A run prepares the working copy, loads its descriptor, provisions the
//! environment, stages the database and support files, and executes the
//! phases. Whatever happens, every process the run started is terminated and
//! one outcome is recorded.

use crate::core::{BranchFilter, PushEvent, RunConfig, RunStatus};
use crate::execution::engine::{ActionHandler, PipelineEngine, RunContext};
use crate::execution::error::RunError;
use crate::execution::provision::Provisioner;
use crate::execution::staging::{apply_support, init_database};
use crate::execution::workspace::SourceProvider;
use crate::persistence::{Reporter, RunOutcome};
use crate::protocol::Endpoint;
use crate::supervisor::ProcessSupervisor;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Message recorded when the working copy has no descriptor
pub const NO_CONFIG_MESSAGE: &str = "no config present";

/// Message recorded when every phase completed
pub const COMPLETED_MESSAGE: &str = "run completed";

/// Result of one run, as reported
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub message: String,
    /// The recorded outcome, absent when reporting failed
    pub outcome: Option<RunOutcome>,
}

enum Completion {
    NoConfig,
    Completed,
}

/// Serializes runs per (repository, branch)
///
/// Entries nobody holds or waits on are pruned on the next `acquire`, so the
/// map stays bounded by the keys in use.
#[derive(Debug, Default)]
pub struct RunLocks {
    locks: Mutex<HashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl RunLocks {
    /// Wait until no other run holds `(repository, branch)`
    pub async fn acquire(&self, repository: &str, branch: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Holders and waiters each keep a clone; the map's own is the only other
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((repository.to_string(), branch.to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Executes runs for push events
pub struct Runner<H> {
    engine: PipelineEngine<H>,
    source: Arc<dyn SourceProvider>,
    provisioner: Arc<dyn Provisioner>,
    reporter: Reporter,
    filter: BranchFilter,
    locks: RunLocks,
}

impl<H: ActionHandler + 'static> Runner<H> {
    pub fn new(
        engine: PipelineEngine<H>,
        source: Arc<dyn SourceProvider>,
        provisioner: Arc<dyn Provisioner>,
        reporter: Reporter,
    ) -> Self {
        Self {
            engine,
            source,
            provisioner,
            reporter,
            filter: BranchFilter::all(),
            locks: RunLocks::default(),
        }
    }

    /// Only trigger for branches matching `filter`
    pub fn with_branch_filter(mut self, filter: BranchFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn engine(&self) -> &PipelineEngine<H> {
        &self.engine
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Start a run in the background if the pushed branch passes the filter
    ///
    /// Returns `None` for filtered-out events.
    pub fn trigger(self: &Arc<Self>, event: PushEvent) -> Option<JoinHandle<RunResult>> {
        if !self.filter.matches(&event.git_ref) {
            info!(
                repository = %event.repository.name,
                git_ref = %event.git_ref,
                "push does not match branch filter; ignoring"
            );
            return None;
        }

        let runner = Arc::clone(self);
        Some(tokio::spawn(async move { runner.run(&event).await }))
    }

    /// Execute one run to completion and record its outcome
    pub async fn run(&self, event: &PushEvent) -> RunResult {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "run",
            %run_id,
            repository = %event.repository.name,
            git_ref = %event.git_ref
        );
        self.run_inner(run_id, event).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, event: &PushEvent) -> RunResult {
        let key = event.branch().unwrap_or(event.git_ref.as_str());
        let _guard = self.locks.acquire(&event.repository.name, key).await;

        let started_at = Instant::now();
        info!("run started");

        let mut supervisor = ProcessSupervisor::new();
        let result = self.execute(run_id, event, &mut supervisor).await;

        // Teardown happens on every exit path, before reporting
        supervisor.terminate_all().await;

        let (status, message) = match result {
            Ok(Completion::NoConfig) => (RunStatus::Skipped, NO_CONFIG_MESSAGE.to_string()),
            Ok(Completion::Completed) => (RunStatus::Success, COMPLETED_MESSAGE.to_string()),
            Err(e) => {
                warn!("run failed: {}", e);
                (RunStatus::Failed, e.to_string())
            }
        };

        let outcome = self.reporter.report(&message, status, started_at).await;
        RunResult {
            run_id,
            status,
            message,
            outcome,
        }
    }

    async fn execute(
        &self,
        run_id: Uuid,
        event: &PushEvent,
        supervisor: &mut ProcessSupervisor,
    ) -> Result<Completion, RunError> {
        let branch = event
            .branch()
            .ok_or_else(|| RunError::NotABranch(event.git_ref.clone()))?;
        let working_dir = self.source.prepare(&event.repository, branch).await?;

        let config = match RunConfig::load(&working_dir)? {
            Some(config) => config,
            None => {
                info!(path = %working_dir.display(), "{}", NO_CONFIG_MESSAGE);
                return Ok(Completion::NoConfig);
            }
        };
        let endpoint = Endpoint::parse(config.endpoint()?);

        if let Some(environment) = &config.environment {
            self.provisioner.provision(environment).await?;
        }
        if let Some(database) = &config.database {
            init_database(&working_dir, database)
                .await
                .map_err(RunError::Database)?;
        }

        let support_roots = apply_support(&working_dir, &config.support).map_err(RunError::Staging)?;

        supervisor.set_working_dir(&working_dir);
        let mut ctx = RunContext {
            run_id,
            working_dir,
            endpoint,
            supervisor,
        };
        let phases = self.engine.execute(&config, &mut ctx).await;

        drop(support_roots);
        phases?;
        Ok(Completion::Completed)
    }
}
