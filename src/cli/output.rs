//! CLI output formatting

use crate::core::{RunConfig, RunStatus};
use crate::execution::ExecutionEvent;
use crate::persistence::RunOutcome;
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Success => style("SUCCESS").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
        RunStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format one recorded outcome as a result-listing row
pub fn format_outcome(outcome: &RunOutcome) -> String {
    let icon = match outcome.status {
        RunStatus::Success => CHECK,
        RunStatus::Failed => CROSS,
        RunStatus::Skipped => SKIP,
    };

    format!(
        "{}{} {} {} {} {}",
        icon,
        style(format!("#{}", outcome.id)).dim(),
        format_status(outcome.status),
        style(outcome.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
        style(format!("{}s", outcome.formatted_duration())).cyan(),
        outcome.message
    )
}

/// Summarize a validated descriptor
pub fn format_config_summary(config: &RunConfig) -> Vec<String> {
    let mut lines = Vec::new();
    if let Ok(endpoint) = config.endpoint() {
        lines.push(format!("Endpoint: {}", style(endpoint).bold()));
    }
    if let Some(environment) = &config.environment {
        lines.push(format!(
            "Environment: {} ({} dependencies, {} pip packages)",
            style(&environment.name).bold(),
            environment.dependencies.len(),
            environment.pip.len()
        ));
    }
    if let Some(database) = &config.database {
        lines.push(format!(
            "Database: {} ({} scripts)",
            style(database.path.display()).bold(),
            database.sql.len()
        ));
    }
    lines.push(format!("Support directives: {}", style(config.support.len()).cyan()));
    for phase in crate::core::Phase::ALL {
        lines.push(format!(
            "{}: {}",
            phase,
            style(config.steps(phase).len()).cyan()
        ));
    }
    lines
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PhaseStarted { phase, steps } => format!(
            "{}{} ({} steps)",
            ROCKET,
            style(phase).bold(),
            style(steps).dim()
        ),
        ExecutionEvent::StepStarted { step, .. } => format!("{}{}", SPINNER, style(step).cyan()),
        ExecutionEvent::StepCompleted { step, .. } => format!("{}{}", CHECK, style(step).green()),
        ExecutionEvent::StepFailed { step, error, .. } => {
            format!("{}{}: {}", CROSS, style(step).red(), style(error).dim())
        }
        ExecutionEvent::PhaseCompleted { phase } => {
            format!("{}{} {}", INFO, style(phase).bold(), style("completed").green())
        }
    }
}
