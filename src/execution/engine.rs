//! Phase execution engine
//!
//! Runs the steps of each phase strictly in order, pre-run then run then
//! post-run. The first failing step aborts its phase and every later phase;
//! there are no retries.

use crate::core::{Phase, RunConfig, StepSpec};
use crate::execution::error::{ActionError, PhaseFailure};
use crate::protocol::Endpoint;
use crate::supervisor::ProcessSupervisor;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Events that can occur during phase execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PhaseStarted {
        phase: Phase,
        steps: usize,
    },
    StepStarted {
        phase: Phase,
        step: String,
    },
    StepCompleted {
        phase: Phase,
        step: String,
    },
    StepFailed {
        phase: Phase,
        step: String,
        error: String,
    },
    PhaseCompleted {
        phase: Phase,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Per-run state handed to every step
pub struct RunContext<'a> {
    pub run_id: Uuid,
    /// Root of the working copy the run executes in
    pub working_dir: PathBuf,
    /// Device-control socket of the experiment controller
    pub endpoint: Endpoint,
    /// Processes started by this run
    pub supervisor: &'a mut ProcessSupervisor,
}

/// Binds step actions to their behavior
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Execute one step; an error fails the enclosing phase
    async fn execute(&self, step: &StepSpec, ctx: &mut RunContext<'_>) -> Result<(), ActionError>;
}

/// Executes the phases of a run descriptor
pub struct PipelineEngine<H> {
    handler: H,
    event_handlers: Vec<EventHandler>,
}

impl<H: ActionHandler> PipelineEngine<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute all phases in order, stopping at the first failure
    pub async fn execute(&self, config: &RunConfig, ctx: &mut RunContext<'_>) -> Result<(), PhaseFailure> {
        for phase in Phase::ALL {
            self.execute_phase(phase, config.steps(phase), ctx).await?;
        }
        Ok(())
    }

    /// Execute one phase's steps in listed order
    pub async fn execute_phase(
        &self,
        phase: Phase,
        steps: &[StepSpec],
        ctx: &mut RunContext<'_>,
    ) -> Result<(), PhaseFailure> {
        info!(run_id = %ctx.run_id, %phase, steps = steps.len(), "phase started");
        self.emit_event(ExecutionEvent::PhaseStarted {
            phase,
            steps: steps.len(),
        });

        for step in steps {
            let name = step.to_string();
            info!(run_id = %ctx.run_id, %phase, step = %name, "executing step");
            self.emit_event(ExecutionEvent::StepStarted {
                phase,
                step: name.clone(),
            });

            if let Err(e) = self.handler.execute(step, ctx).await {
                error!(run_id = %ctx.run_id, %phase, step = %name, "step failed: {}", e);
                self.emit_event(ExecutionEvent::StepFailed {
                    phase,
                    step: name.clone(),
                    error: e.to_string(),
                });
                return Err(PhaseFailure {
                    phase,
                    step: name,
                    source: e,
                });
            }

            self.emit_event(ExecutionEvent::StepCompleted { phase, step: name });
        }

        info!(run_id = %ctx.run_id, %phase, "phase completed");
        self.emit_event(ExecutionEvent::PhaseCompleted { phase });
        Ok(())
    }
}
