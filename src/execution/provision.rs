//! Environment provisioning

use crate::core::EnvironmentConfig;
use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Errors raised while provisioning an environment
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with code {code}: {stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Prepares the environment a run executes in
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create the environment and install its dependencies
    ///
    /// Must be idempotent: an environment that already exists is not an error.
    async fn provision(&self, environment: &EnvironmentConfig) -> Result<(), ProvisioningError>;
}

/// Provisioner that does nothing, for runs against a prepared machine
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipProvisioning;

#[async_trait]
impl Provisioner for SkipProvisioning {
    async fn provision(&self, environment: &EnvironmentConfig) -> Result<(), ProvisioningError> {
        debug!(environment = %environment.name, "skipping provisioning");
        Ok(())
    }
}

/// Provisions named conda environments
#[derive(Debug, Clone)]
pub struct CondaProvisioner {
    conda: String,
}

impl CondaProvisioner {
    pub fn new(conda: impl Into<String>) -> Self {
        Self { conda: conda.into() }
    }

    async fn conda(&self, args: &[String]) -> Result<(), ProvisioningError> {
        let command = format!("{} {}", self.conda, args.join(" "));
        debug!("running {}", command);

        let output = Command::new(&self.conda)
            .args(args)
            .output()
            .await
            .map_err(|source| ProvisioningError::Spawn {
                program: self.conda.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }

        Err(ProvisioningError::Failed {
            command,
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl Default for CondaProvisioner {
    fn default() -> Self {
        Self::new("conda")
    }
}

#[async_trait]
impl Provisioner for CondaProvisioner {
    async fn provision(&self, environment: &EnvironmentConfig) -> Result<(), ProvisioningError> {
        let mut create = vec![
            "create".to_string(),
            "--yes".to_string(),
            "--name".to_string(),
            environment.name.clone(),
        ];
        create.extend(environment.dependencies.iter().cloned());

        match self.conda(&create).await {
            Ok(()) => info!(environment = %environment.name, "created environment"),
            Err(ProvisioningError::Failed { ref stderr, .. }) if is_already_exists(stderr) => {
                info!(environment = %environment.name, "environment already exists");
            }
            Err(e) => return Err(e),
        }

        if !environment.pip.is_empty() {
            let mut install = vec![
                "run".to_string(),
                "--name".to_string(),
                environment.name.clone(),
                "pip".to_string(),
                "install".to_string(),
            ];
            install.extend(environment.pip.iter().cloned());
            self.conda(&install).await?;
            info!(environment = %environment.name, packages = environment.pip.len(), "installed pip packages");
        }

        Ok(())
    }
}

/// Whether a provisioning failure only reports a pre-existing environment
pub fn is_already_exists(stderr: &str) -> bool {
    stderr.to_lowercase().contains("already exists")
}
