//! Run execution: phases, actions, staging and the top-level runner

pub mod actions;
pub mod engine;
pub mod error;
pub mod provision;
pub mod runner;
pub mod staging;
pub mod workspace;

pub use actions::ControllerActions;
pub use engine::{ActionHandler, EventHandler, ExecutionEvent, PipelineEngine, RunContext};
pub use error::{ActionError, PhaseFailure, RunError};
pub use provision::{CondaProvisioner, Provisioner, ProvisioningError, SkipProvisioning};
pub use runner::{RunLocks, RunResult, Runner};
pub use staging::{apply_support, init_database, StagingError, SupportRoot};
pub use workspace::{GitWorkingCopies, SourceError, SourceProvider, StaticSource};
