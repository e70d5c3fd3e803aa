//! Step domain model
//!
//! A step is written in the descriptor either as a bare action name
//! (`stop_simulator`) or as `action:argument` (`send_command:open valve=A`).
//! Names resolve against the closed [`Action`] table when the descriptor is
//! loaded, so a typo fails the configuration instead of the run.

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Actions a step can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Launch the instrument simulator process
    StartSimulator,
    /// Placeholder; simulators are torn down with the rest of the run's processes
    StopSimulator,
    /// Launch the experiment controller and wait for it to answer a status probe
    StartApp,
    /// Terminate the experiment controller
    StopApp,
    /// Send one command envelope to the controller and expect `OK`
    SendCommand,
    /// Placeholder for result reporting
    ReportResults,
}

/// Whether an action's argument is required, optional, or forbidden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentRule {
    Required,
    Optional,
    None,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::StartSimulator,
        Action::StopSimulator,
        Action::StartApp,
        Action::StopApp,
        Action::SendCommand,
        Action::ReportResults,
    ];

    /// Resolve an action from its descriptor name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }

    /// Name used in descriptors
    pub fn name(&self) -> &'static str {
        match self {
            Action::StartSimulator => "start_simulator",
            Action::StopSimulator => "stop_simulator",
            Action::StartApp => "start_app",
            Action::StopApp => "stop_app",
            Action::SendCommand => "send_command",
            Action::ReportResults => "report_results",
        }
    }

    pub fn argument_rule(&self) -> ArgumentRule {
        match self {
            Action::StartSimulator => ArgumentRule::Optional,
            Action::StartApp | Action::SendCommand => ArgumentRule::Required,
            Action::StopSimulator | Action::StopApp | Action::ReportResults => ArgumentRule::None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single step of a phase: an action plus its optional argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepSpec {
    pub action: Action,
    pub argument: Option<String>,
}

impl StepSpec {
    pub fn new(action: Action, argument: Option<String>) -> Self {
        Self { action, argument }
    }

    /// Parse `action` or `action:argument`, validating against the action table
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let (name, argument) = match text.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.trim())),
            None => (text.trim(), None),
        };
        let argument = argument.filter(|a| !a.is_empty()).map(str::to_string);

        let action =
            Action::from_name(name).ok_or_else(|| ConfigError::UnknownAction(name.to_string()))?;

        match (action.argument_rule(), &argument) {
            (ArgumentRule::Required, None) => {
                return Err(ConfigError::MissingArgument(name.to_string()))
            }
            (ArgumentRule::None, Some(_)) => {
                return Err(ConfigError::UnexpectedArgument(name.to_string()))
            }
            _ => {}
        }

        Ok(Self { action, argument })
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

impl fmt::Display for StepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(argument) => write!(f, "{}:{}", self.action, argument),
            None => write!(f, "{}", self.action),
        }
    }
}

impl TryFrom<String> for StepSpec {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StepSpec> for String {
    fn from(step: StepSpec) -> Self {
        step.to_string()
    }
}
