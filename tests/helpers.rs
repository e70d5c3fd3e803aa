//! Test utility functions for psychodrama

#![allow(dead_code)]

use async_trait::async_trait;
use psychodrama::core::{BranchFilter, PushEvent, RepositoryInfo, StepSpec, DESCRIPTOR_FILENAME};
use psychodrama::execution::{
    ActionError, ActionHandler, PipelineEngine, RunContext, Runner, SkipProvisioning, StaticSource,
};
use psychodrama::persistence::{InMemoryOutcomeStore, OutcomeStore, Reporter, RunOutcome};
use psychodrama::protocol::frame;
use psychodrama::protocol::{CommandEnvelope, Endpoint};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Action handler that records every step instead of touching hardware
///
/// - `start_app` / `start_simulator` really launch their command through the
///   run's supervisor, so teardown can be observed
/// - any step whose argument starts with `fail` raises
/// - every step records whether `watched` exists at the time it runs
#[derive(Default)]
pub struct RecordingActions {
    pub steps: Mutex<Vec<String>>,
    pub pids: Mutex<Vec<u32>>,
    pub watched: Option<PathBuf>,
    pub watched_seen: Mutex<Vec<bool>>,
    pub delay: Option<Duration>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl RecordingActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watching(mut self, path: impl Into<PathBuf>) -> Self {
        self.watched = Some(path.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().unwrap().clone()
    }

    pub fn pids(&self) -> Vec<u32> {
        self.pids.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionHandler for RecordingActions {
    async fn execute(&self, step: &StepSpec, ctx: &mut RunContext<'_>) -> Result<(), ActionError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        self.steps.lock().unwrap().push(step.to_string());
        if let Some(path) = &self.watched {
            self.watched_seen.lock().unwrap().push(path.exists());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = match (step.action.name(), step.argument()) {
            (_, Some(arg)) if arg.starts_with("fail") => Err(ActionError::Failed(format!("{} raised", arg))),
            ("start_app" | "start_simulator", Some(command)) => {
                let name = format!("{}-{}", step.action.name(), ctx.supervisor.len());
                let command: Vec<String> = command.split_whitespace().map(String::from).collect();
                ctx.supervisor
                    .start(&name, &command, &HashMap::new())
                    .map(|pid| self.pids.lock().unwrap().extend(pid))
                    .map_err(ActionError::from)
            }
            _ => Ok(()),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// A working copy with a descriptor, plus a runner wired to it
pub struct TestBed<H> {
    pub dir: TempDir,
    pub runner: Arc<Runner<H>>,
    pub store: Arc<InMemoryOutcomeStore>,
}

impl<H: ActionHandler + 'static> TestBed<H> {
    /// Runner over a fresh working copy; `descriptor` is written unless `None`
    pub fn new(descriptor: Option<&str>, handler: impl FnOnce(&Path) -> H) -> Self {
        Self::filtered(descriptor, BranchFilter::all(), handler)
    }

    /// Like [`TestBed::new`], only triggering for branches matching `filter`
    pub fn filtered(descriptor: Option<&str>, filter: BranchFilter, handler: impl FnOnce(&Path) -> H) -> Self {
        let dir = tempfile::tempdir().unwrap();
        if let Some(descriptor) = descriptor {
            std::fs::write(dir.path().join(DESCRIPTOR_FILENAME), descriptor).unwrap();
        }

        let store = Arc::new(InMemoryOutcomeStore::new());
        let engine = PipelineEngine::new(handler(dir.path()));
        let runner = Runner::new(
            engine,
            Arc::new(StaticSource::new(dir.path())),
            Arc::new(SkipProvisioning),
            Reporter::new(store.clone() as Arc<dyn OutcomeStore>),
        )
        .with_branch_filter(filter);

        Self {
            dir,
            runner: Arc::new(runner),
            store,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn handler(&self) -> &H {
        self.runner.engine().handler()
    }

    /// Wait until `count` outcomes are recorded; panics after five seconds
    pub async fn wait_for_outcomes(&self, count: usize) -> Vec<RunOutcome> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let outcomes = self.store.list(usize::MAX).await.unwrap();
            if outcomes.len() >= count {
                return outcomes;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected {} outcomes, found {}",
                count,
                outcomes.len()
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// Push event for `branch` of the `experiment` repository
pub fn push_event(branch: &str) -> PushEvent {
    PushEvent {
        git_ref: format!("refs/heads/{}", branch),
        repository: RepositoryInfo {
            name: "experiment".to_string(),
            url: Some("https://example.com/lab/experiment.git".to_string()),
            clone_url: None,
        },
    }
}

/// Fake experiment controller answering every command with `reply`
pub struct FakeController {
    pub endpoint: Endpoint,
    pub received: Arc<Mutex<Vec<CommandEnvelope>>>,
}

impl FakeController {
    pub async fn start(reply: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Endpoint::Tcp(listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                if let Ok(envelope) = frame::read_frame(&mut stream).await {
                    sink.lock().unwrap().push(envelope);
                    let _ = stream.write_all(reply.as_bytes()).await;
                }
            }
        });

        Self { endpoint, received }
    }

    pub fn commands(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.command.clone())
            .collect()
    }
}

/// Whether a process with `pid` still exists
#[cfg(target_os = "linux")]
pub fn process_exists(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}
