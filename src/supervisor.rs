//! Process supervision for a single run
//!
//! The supervisor owns every OS process started for a run, keyed by logical
//! name. Processes are spawned without waiting on them; readiness is a
//! separate, best-effort poll. [`ProcessSupervisor::terminate_all`] is called
//! on every exit path of a run, and dropping the supervisor kills anything
//! still recorded.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Default bound on [`ProcessSupervisor::await_ready`]
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Default pause between readiness probes
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Errors raised when starting processes
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("empty command line for process '{0}'")]
    EmptyCommand(String),

    #[error("process '{0}' is already running")]
    AlreadyRunning(String),

    #[error("failed to spawn '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Owns the processes started during one run
#[derive(Debug, Default)]
pub struct ProcessSupervisor {
    processes: HashMap<String, Child>,
    working_dir: Option<PathBuf>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start processes from `dir` instead of the current directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.set_working_dir(dir);
        self
    }

    pub fn set_working_dir(&mut self, dir: impl Into<PathBuf>) {
        self.working_dir = Some(dir.into());
    }

    /// Launch `command` under `name` without waiting for it
    ///
    /// The first element of `command` is the program. Returns the OS process id.
    pub fn start(
        &mut self,
        name: &str,
        command: &[String],
        env_overrides: &HashMap<String, String>,
    ) -> Result<Option<u32>, SupervisorError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| SupervisorError::EmptyCommand(name.to_string()))?;

        if self.is_running(name) {
            return Err(SupervisorError::AlreadyRunning(name.to_string()));
        }

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(env_overrides)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            name: name.to_string(),
            source,
        })?;
        let pid = child.id();

        info!(process = name, pid = ?pid, "started {}", command.join(" "));
        self.processes.insert(name.to_string(), child);
        Ok(pid)
    }

    /// Whether `name` is recorded and has not exited
    pub fn is_running(&mut self, name: &str) -> bool {
        match self.processes.get_mut(name) {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// OS process id of a recorded process
    pub fn pid(&self, name: &str) -> Option<u32> {
        self.processes.get(name).and_then(Child::id)
    }

    /// Names of all recorded processes
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.processes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Poll `probe` until it reports ready or `timeout` elapses
    ///
    /// Returns whether the process became ready. A timeout is logged, not
    /// raised: callers proceed either way.
    pub async fn await_ready<F, Fut>(
        &self,
        name: &str,
        mut probe: F,
        timeout: Duration,
        interval: Duration,
    ) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let deadline = Instant::now() + timeout;
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            if probe().await {
                info!(process = name, attempts, "process ready");
                return true;
            }
            if Instant::now() >= deadline {
                warn!(
                    process = name,
                    attempts,
                    "not ready after {:?}; continuing anyway", timeout
                );
                return false;
            }
            debug!(process = name, attempts, "waiting for process");
            sleep(interval).await;
        }
    }

    /// Terminate one recorded process
    ///
    /// Returns `false` when no process was recorded under `name`.
    pub async fn terminate(&mut self, name: &str) -> bool {
        match self.processes.remove(name) {
            Some(child) => {
                kill(name, child).await;
                true
            }
            None => {
                debug!(process = name, "nothing to terminate");
                false
            }
        }
    }

    /// Terminate every recorded process
    ///
    /// A failure on one process never stops the others from being signaled.
    /// Returns how many processes were signaled.
    pub async fn terminate_all(&mut self) -> usize {
        let processes: Vec<_> = self.processes.drain().collect();
        let count = processes.len();

        for (name, child) in processes {
            kill(&name, child).await;
        }

        if count > 0 {
            info!(count, "terminated run processes");
        }
        count
    }
}

async fn kill(name: &str, mut child: Child) {
    match child.kill().await {
        Ok(()) => info!(process = name, "terminated"),
        Err(e) => warn!(process = name, "failed to terminate: {}", e),
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        for (name, child) in self.processes.iter_mut() {
            if let Err(e) = child.start_kill() {
                debug!(process = %name, "kill on drop failed: {}", e);
            }
        }
    }
}
