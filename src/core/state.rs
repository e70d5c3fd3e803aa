//! Execution state models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three ordered phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    PreRun,
    Run,
    PostRun,
}

impl Phase {
    /// All phases in execution order
    pub const ALL: [Phase; 3] = [Phase::PreRun, Phase::Run, Phase::PostRun];

    /// Descriptor key holding this phase's steps
    pub fn key(&self) -> &'static str {
        match self {
            Phase::PreRun => "pre_run",
            Phase::Run => "run",
            Phase::PostRun => "post_run",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::PreRun => "PreRun",
            Phase::Run => "Run",
            Phase::PostRun => "PostRun",
        };
        f.write_str(name)
    }
}

/// Final status of a run, as recorded in the outcome log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every phase completed
    Success,
    /// The run was aborted by a configuration, provisioning, staging or phase failure
    Failed,
    /// The working copy carried no run descriptor
    Skipped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            "skipped" => Ok(RunStatus::Skipped),
            other => Err(format!("unknown run status: {}", other)),
        }
    }
}
