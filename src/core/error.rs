//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating a run descriptor
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read descriptor {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid descriptor: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("descriptor is missing required field 'endpoint'")]
    MissingEndpoint,

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("action '{0}' requires an argument")]
    MissingArgument(String),

    #[error("action '{0}' does not take an argument")]
    UnexpectedArgument(String),
}
