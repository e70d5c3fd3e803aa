//! psychodrama - webhook-triggered hardware-in-the-loop experiment orchestrator

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod protocol;
pub mod server;
pub mod simulator;
pub mod supervisor;

// Re-export commonly used types
pub use crate::core::{BranchFilter, Phase, PushEvent, RunConfig, RunStatus, StepSpec};
pub use crate::execution::{ActionHandler, ControllerActions, ExecutionEvent, PipelineEngine, RunResult, Runner};
pub use crate::persistence::{InMemoryOutcomeStore, OutcomeStore, Reporter, RunOutcome, SqliteOutcomeStore};
pub use crate::protocol::{CommandEnvelope, ControllerClient, Endpoint};
pub use crate::supervisor::ProcessSupervisor;
