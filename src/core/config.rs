//! Run descriptor loaded from YAML
//!
//! Each repository carries a `psychodrama.yaml` at its root describing how an
//! experiment run is prepared and driven:
//!
//! ```yaml
//! endpoint: /tmp/controller.sock
//! environment:
//!   name: experiment
//!   dependencies: [numpy]
//!   pip: [pyserial]
//! database:
//!   path: data/experiment.sqlite3
//!   sql:
//!     - "CREATE TABLE runs (id INTEGER); INSERT INTO runs VALUES (1)"
//! support:
//!   - root: support
//!   - path: support/setupfiles
//!   - path: support/setupfiles/devices.yaml
//!     text: "valve: 8000"
//! pre_run: [start_simulator, "start_app:python controller.py"]
//! run: ["send_command:open valve=A"]
//! post_run: [stop_app, report_results]
//! ```

use crate::core::{error::ConfigError, state::Phase, step::StepSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Descriptor filename looked up at the root of the working copy
pub const DESCRIPTOR_FILENAME: &str = "psychodrama.yaml";

/// Top-level run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Device-control socket address; required before any phase runs
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment to provision before the run
    #[serde(default)]
    pub environment: Option<EnvironmentConfig>,

    /// Database recreated from scratch before the run
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Filesystem staging directives, applied in order
    #[serde(default)]
    pub support: Vec<SupportDirective>,

    #[serde(default)]
    pub pre_run: Vec<StepSpec>,

    #[serde(default)]
    pub run: Vec<StepSpec>,

    #[serde(default)]
    pub post_run: Vec<StepSpec>,
}

/// Named environment with its dependency lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,

    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Packages installed into the environment after creation
    #[serde(default)]
    pub pip: Vec<String>,
}

/// Database file plus the statements used to initialize it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,

    /// Statements executed in order; each may hold several `;`-separated statements
    #[serde(default)]
    pub sql: Vec<String>,
}

/// A filesystem staging directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SupportDirective {
    /// Write a text file, creating parent directories
    WriteFile { path: PathBuf, text: String },
    /// Declare the support root, removed when phase execution ends
    Root { root: PathBuf },
    /// Ensure a directory exists
    Directory { path: PathBuf },
}

impl RunConfig {
    /// Load configuration from a descriptor file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    ///
    /// Step names are validated here; a missing endpoint is reported
    /// separately by [`RunConfig::endpoint`].
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load the descriptor from a working copy
    ///
    /// Returns `Ok(None)` when the working copy has no descriptor.
    pub fn load(working_copy: &Path) -> Result<Option<Self>, ConfigError> {
        let path = working_copy.join(DESCRIPTOR_FILENAME);
        if !path.is_file() {
            return Ok(None);
        }
        Self::from_file(&path).map(Some)
    }

    /// The configured endpoint, or a configuration error when absent
    pub fn endpoint(&self) -> Result<&str, ConfigError> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ConfigError::MissingEndpoint)
    }

    /// Steps of one phase, in listed order
    pub fn steps(&self, phase: Phase) -> &[StepSpec] {
        match phase {
            Phase::PreRun => &self.pre_run,
            Phase::Run => &self.run,
            Phase::PostRun => &self.post_run,
        }
    }

    pub fn total_steps(&self) -> usize {
        Phase::ALL.iter().map(|p| self.steps(*p).len()).sum()
    }
}
