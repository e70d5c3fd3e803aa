//! Step actions bound to the process supervisor and the device-control client

use crate::core::{Action, StepSpec};
use crate::execution::engine::{ActionHandler, RunContext};
use crate::execution::error::ActionError;
use crate::protocol::frame::COMMAND_KEY;
use crate::protocol::{CommandEnvelope, ControllerClient};
use crate::supervisor::{DEFAULT_PROBE_INTERVAL, DEFAULT_READY_TIMEOUT};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Process name the simulator is recorded under
pub const SIMULATOR_PROCESS: &str = "simulator";

/// Process name the experiment controller is recorded under
pub const APP_PROCESS: &str = "app";

/// Reply a controller sends when a command succeeded
pub const OK_REPLY: &str = "OK";

/// Environment variable handing the endpoint to started processes
pub const ENDPOINT_ENV: &str = "PSYCHODRAMA_ENDPOINT";

/// Environment variable handing the run id to started processes
pub const RUN_ID_ENV: &str = "PSYCHODRAMA_RUN_ID";

/// Production action handler
#[derive(Debug, Clone)]
pub struct ControllerActions {
    ready_timeout: Duration,
    probe_interval: Duration,
    simulator_command: Vec<String>,
}

impl ControllerActions {
    pub fn new() -> Self {
        Self {
            ready_timeout: DEFAULT_READY_TIMEOUT,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            simulator_command: default_simulator_command(),
        }
    }

    /// Bound and polling interval of the readiness probe after `start_app`
    pub fn with_readiness(mut self, timeout: Duration, interval: Duration) -> Self {
        self.ready_timeout = timeout;
        self.probe_interval = interval;
        self
    }

    /// Command used by `start_simulator` when the step gives none
    pub fn with_simulator_command(mut self, command: Vec<String>) -> Self {
        self.simulator_command = command;
        self
    }

    pub fn simulator_command(&self) -> &[String] {
        &self.simulator_command
    }

    fn environment(ctx: &RunContext<'_>) -> HashMap<String, String> {
        HashMap::from([
            (ENDPOINT_ENV.to_string(), ctx.endpoint.to_string()),
            (RUN_ID_ENV.to_string(), ctx.run_id.to_string()),
        ])
    }

    async fn start_app(&self, command: &str, ctx: &mut RunContext<'_>) -> Result<(), ActionError> {
        let command = split_command(command);
        let env = Self::environment(ctx);
        ctx.supervisor.start(APP_PROCESS, &command, &env)?;

        let client = ControllerClient::new(ctx.endpoint.clone());
        ctx.supervisor
            .await_ready(
                APP_PROCESS,
                || client.probe(),
                self.ready_timeout,
                self.probe_interval,
            )
            .await;
        Ok(())
    }
}

impl Default for ControllerActions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionHandler for ControllerActions {
    async fn execute(&self, step: &StepSpec, ctx: &mut RunContext<'_>) -> Result<(), ActionError> {
        match step.action {
            Action::StartSimulator => {
                let command = match step.argument() {
                    Some(command) => split_command(command),
                    None => self.simulator_command.clone(),
                };
                let env = Self::environment(ctx);
                ctx.supervisor.start(SIMULATOR_PROCESS, &command, &env)?;
                Ok(())
            }
            // Simulators are torn down with every other run process
            Action::StopSimulator => Ok(()),
            Action::StartApp => {
                let command = step
                    .argument()
                    .ok_or(ActionError::MissingArgument(Action::StartApp.name()))?;
                self.start_app(command, ctx).await
            }
            Action::StopApp => {
                if !ctx.supervisor.terminate(APP_PROCESS).await {
                    warn!(run_id = %ctx.run_id, "stop_app: no app process was started");
                }
                Ok(())
            }
            Action::SendCommand => {
                let argument = step
                    .argument()
                    .ok_or(ActionError::MissingArgument(Action::SendCommand.name()))?;
                let envelope = parse_envelope(argument)?;
                ControllerClient::new(ctx.endpoint.clone())
                    .expect(&envelope, OK_REPLY)
                    .await?;
                Ok(())
            }
            Action::ReportResults => {
                info!(run_id = %ctx.run_id, "results are recorded when the run finishes");
                Ok(())
            }
        }
    }
}

/// Split a command line on whitespace
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

/// Build an envelope from `<command> [key=value ...]`
///
/// Values that parse as JSON keep their JSON type; anything else is a string.
pub fn parse_envelope(argument: &str) -> Result<CommandEnvelope, ActionError> {
    let mut tokens = argument.split_whitespace();
    let command = tokens.next().ok_or_else(|| ActionError::InvalidArgument {
        argument: argument.to_string(),
        reason: "missing command".to_string(),
    })?;

    let mut envelope = CommandEnvelope::new(command);
    for token in tokens {
        let (key, value) = token
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| ActionError::InvalidArgument {
                argument: argument.to_string(),
                reason: format!("expected key=value, got '{}'", token),
            })?;
        if key == COMMAND_KEY {
            return Err(ActionError::InvalidArgument {
                argument: argument.to_string(),
                reason: format!("'{}' is reserved for the command name", COMMAND_KEY),
            });
        }
        let value = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        envelope = envelope.with(key, value);
    }

    Ok(envelope)
}

fn default_simulator_command() -> Vec<String> {
    let program = std::env::current_exe()
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|_| env!("CARGO_PKG_NAME").to_string());
    vec![program, "simulate".to_string()]
}
