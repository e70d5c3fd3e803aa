//! Execution errors

use crate::core::{ConfigError, Phase};
use crate::execution::provision::ProvisioningError;
use crate::execution::staging::StagingError;
use crate::execution::workspace::SourceError;
use crate::protocol::ProtocolError;
use crate::supervisor::SupervisorError;
use thiserror::Error;

/// Failure of a single step
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action '{0}' requires an argument")]
    MissingArgument(&'static str),

    #[error("invalid argument '{argument}': {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Failed(String),
}

/// A phase aborted by its first failing step
#[derive(Debug, Error)]
#[error("{phase} failed at step '{step}': {source}")]
pub struct PhaseFailure {
    pub phase: Phase,
    pub step: String,
    #[source]
    pub source: ActionError,
}

/// Reasons a run ends before or during phase execution
#[derive(Debug, Error)]
pub enum RunError {
    #[error("push event does not name a branch: '{0}'")]
    NotABranch(String),

    #[error("failed to prepare working copy: {0}")]
    Source(#[from] SourceError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("provisioning failed: {0}")]
    Provisioning(#[from] ProvisioningError),

    #[error("database initialization failed: {0}")]
    Database(#[source] StagingError),

    #[error("support staging failed: {0}")]
    Staging(#[source] StagingError),

    #[error(transparent)]
    Phase(#[from] PhaseFailure),
}
