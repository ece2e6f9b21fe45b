//! Workflow execution state

use serde::Serialize;
use std::time::Instant;

/// How a single step ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Ok,
    Failed,
    Skipped,
}

/// Record of one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub name: String,
    pub status: StepStatus,
    /// What was sent/matched, or the error message on failure
    pub detail: Option<String>,
    pub duration_ms: u64,
}

impl StepOutcome {
    pub fn ok(name: impl Into<String>, detail: Option<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Ok,
            detail,
            duration_ms,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Failed,
            detail: Some(error.into()),
            duration_ms,
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Skipped,
            detail: Some(reason.into()),
            duration_ms: 0,
        }
    }
}

/// Mutable state while a workflow runs.
#[derive(Debug)]
pub struct RunState {
    outcomes: Vec<StepOutcome>,
    failed: bool,
    started: Instant,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            failed: false,
            started: Instant::now(),
        }
    }

    /// Record an outcome. A failed step fails the run unless the step is
    /// marked continue_on_error.
    pub fn record(&mut self, outcome: StepOutcome, continue_on_error: bool) {
        if outcome.status == StepStatus::Failed && !continue_on_error {
            self.failed = true;
        }
        self.outcomes.push(outcome);
    }

    pub fn failed(&self) -> bool {
        self.failed
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Final report for a workflow run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub workflow: String,
    pub region: String,
    pub success: bool,
    pub steps: Vec<StepOutcome>,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn from_state(state: RunState, workflow: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            region: region.into(),
            success: !state.failed,
            duration_ms: state.started.elapsed().as_millis() as u64,
            steps: state.outcomes,
        }
    }

    /// Get a specific step's outcome
    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|o| o.name == name)
    }

    /// Names of steps that failed
    pub fn failed_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|o| o.status == StepStatus::Failed)
            .map(|o| o.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_marks_run_failed() {
        let mut state = RunState::new();
        state.record(StepOutcome::ok("ssh", None, 10), false);
        assert!(!state.failed());

        state.record(StepOutcome::failed("server", "boom", 5), false);
        assert!(state.failed());
    }

    #[test]
    fn continue_on_error_keeps_run_alive() {
        let mut state = RunState::new();
        state.record(StepOutcome::failed("clockin", "offline", 5), true);
        assert!(!state.failed());

        let summary = RunSummary::from_state(state, "work-tabs", "au");
        assert!(summary.success);
        assert_eq!(summary.failed_steps(), vec!["clockin"]);
    }

    #[test]
    fn summary_exposes_outcomes_in_order() {
        let mut state = RunState::new();
        state.record(StepOutcome::ok("ssh", Some("tssh".into()), 3), false);
        state.record(StepOutcome::skipped("auth", "dry-run"), false);

        let summary = RunSummary::from_state(state, "dev-stack", "eu");
        assert_eq!(summary.steps.len(), 2);
        assert_eq!(summary.steps[0].name, "ssh");
        assert_eq!(summary.outcome("auth").unwrap().status, StepStatus::Skipped);
        assert!(summary.outcome("nope").is_none());
    }
}
