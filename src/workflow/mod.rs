//! Workflow execution

mod executor;
mod runner;
mod state;

pub use executor::{ExecutionContext, StepError, execute_step};
pub use runner::{WorkflowError, WorkflowRunner};
pub use state::{RunState, RunSummary, StepOutcome, StepStatus};
