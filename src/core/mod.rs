//! Core domain models
//!
//! Run descriptors, steps, webhook events and execution state.

pub mod config;
pub mod error;
pub mod event;
pub mod state;
pub mod step;

pub use config::{DatabaseConfig, EnvironmentConfig, RunConfig, SupportDirective, DESCRIPTOR_FILENAME};
pub use error::ConfigError;
pub use event::{BranchFilter, PushEvent, RepositoryInfo};
pub use state::{Phase, RunStatus};
pub use step::{Action, StepSpec};
