//! Workflow runner - builds the layout and walks the steps
//!
//! Workflows are linear scripts: steps run in listed order, and a wait step
//! simply blocks the walk until its markers show up. A failing step stops
//! the run unless it is marked continue_on_error; either way every step's
//! outcome lands in the summary.

use super::executor::{ExecutionContext, execute_step};
use super::state::{RunState, RunSummary, StepOutcome};
use crate::config::{ConfigError, WorkflowConfig, WorktabsConfig};
use crate::layout::{self, LayoutError};
use crate::template::{TemplateContext, TemplateEngine};
use crate::terminal::TerminalControl;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort a run before or outside of step execution
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow '{name}' is invalid:\n  {errors:?}")]
    Invalid { name: String, errors: Vec<String> },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
}

/// Workflow runner
pub struct WorkflowRunner {
    config: Arc<WorktabsConfig>,
}

impl WorkflowRunner {
    pub fn new(config: Arc<WorktabsConfig>) -> Self {
        Self { config }
    }

    /// Run a workflow against a terminal backend.
    ///
    /// Step failures do not produce an `Err`; they are reported through the
    /// summary so the caller still sees which steps ran.
    pub async fn run(
        &self,
        workflow: &WorkflowConfig,
        region_override: Option<&str>,
        args: HashMap<String, String>,
        ctrl: &dyn TerminalControl,
        dry_run: bool,
    ) -> Result<RunSummary, WorkflowError> {
        if let Err(errors) = workflow.validate() {
            return Err(WorkflowError::Invalid {
                name: workflow.name.clone(),
                errors,
            });
        }

        let region_name = region_override.unwrap_or(&self.config.defaults.region);
        let region = self.config.region(region_name)?;

        tracing::info!(
            workflow = %workflow.name,
            region = %region_name,
            dry_run,
            "starting workflow"
        );

        let panes = layout::build(ctrl, &workflow.layout).await?;

        let engine = TemplateEngine::new();
        let template_ctx = TemplateContext::new(&workflow.name, region_name, region, args);

        let ctx = ExecutionContext {
            ctrl,
            panes: &panes,
            region,
            engine: &engine,
            template_ctx: &template_ctx,
            wait_defaults: self.config.wait_options(),
            dry_run,
        };

        let mut state = RunState::new();

        for step in &workflow.steps {
            match execute_step(step, &ctx).await {
                Ok(outcome) => {
                    tracing::info!(
                        step = %step.name,
                        status = ?outcome.status,
                        detail = outcome.detail.as_deref().unwrap_or(""),
                        "step finished"
                    );
                    state.record(outcome, step.continue_on_error);
                }
                Err(e) => {
                    let message = e.to_string();
                    if step.continue_on_error {
                        tracing::warn!(step = %step.name, error = %message, "step failed, continuing");
                    } else {
                        tracing::error!(step = %step.name, error = %message, "step failed");
                    }
                    state.record(
                        StepOutcome::failed(&step.name, message, 0),
                        step.continue_on_error,
                    );
                }
            }

            if state.failed() {
                break;
            }
        }

        let summary = RunSummary::from_state(state, &workflow.name, region_name);
        tracing::info!(
            workflow = %workflow.name,
            success = summary.success,
            steps = summary.steps.len(),
            duration_ms = summary.duration_ms,
            "workflow finished"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StepConfig, StepType};
    use crate::layout::{LayoutConfig, SplitSpec};
    use crate::terminal::{Action, PaneId, RecordingControl, SplitDirection};

    fn runner() -> WorkflowRunner {
        WorkflowRunner::new(Arc::new(WorktabsConfig::default()))
    }

    /// The original four-pane morning workflow, inline.
    fn work_tabs_workflow() -> WorkflowConfig {
        WorkflowConfig {
            name: "work-tabs".into(),
            layout: LayoutConfig {
                root: "main".into(),
                splits: vec![
                    SplitSpec {
                        name: "clockin".into(),
                        from: "main".into(),
                        direction: SplitDirection::Right,
                        rows: None,
                    },
                    SplitSpec {
                        name: "sync".into(),
                        from: "clockin".into(),
                        direction: SplitDirection::Below,
                        rows: None,
                    },
                ],
            },
            steps: vec![
                StepConfig {
                    name: "ssh".into(),
                    step_type: StepType::Run,
                    pane: Some("main".into()),
                    command: Some("{{ region.ssh }}".into()),
                    ..Default::default()
                },
                StepConfig {
                    name: "clockin".into(),
                    step_type: StepType::Run,
                    pane: Some("clockin".into()),
                    command: Some("tanda_cli clockin start".into()),
                    ..Default::default()
                },
                StepConfig {
                    name: "sync".into(),
                    step_type: StepType::Run,
                    pane: Some("sync".into()),
                    command: Some("{{ region.sync }}".into()),
                    ..Default::default()
                },
                StepConfig {
                    name: "focus-main".into(),
                    step_type: StepType::Focus,
                    pane: Some("main".into()),
                    ..Default::default()
                },
                StepConfig {
                    name: "server".into(),
                    step_type: StepType::Run,
                    pane: Some("main".into()),
                    command: Some("tanda-server".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn runs_work_tabs_against_au_region() {
        let ctrl = RecordingControl::new();
        let summary = runner()
            .run(&work_tabs_workflow(), None, HashMap::new(), &ctrl, false)
            .await
            .unwrap();

        assert!(summary.success);
        assert_eq!(summary.region, "au");
        assert_eq!(summary.steps.len(), 5);

        // RecordingControl mints p0 (main), p1 (clockin), p2 (sync)
        assert_eq!(
            ctrl.sent_text(&PaneId::new("p0")),
            vec!["tssh", "tanda-server"]
        );
        assert_eq!(
            ctrl.sent_text(&PaneId::new("p1")),
            vec!["tanda_cli clockin start"]
        );
        assert_eq!(ctrl.sent_text(&PaneId::new("p2")), vec!["tsr"]);
    }

    #[tokio::test]
    async fn region_override_selects_eu_commands() {
        let ctrl = RecordingControl::new();
        let summary = runner()
            .run(&work_tabs_workflow(), Some("eu"), HashMap::new(), &ctrl, false)
            .await
            .unwrap();

        assert!(summary.success);
        assert_eq!(summary.region, "eu");
        assert_eq!(
            ctrl.sent_text(&PaneId::new("p0")),
            vec!["eutssh", "tanda-server"]
        );
        assert_eq!(ctrl.sent_text(&PaneId::new("p2")), vec!["eutsr"]);
    }

    #[tokio::test]
    async fn unknown_region_is_a_config_error() {
        let ctrl = RecordingControl::new();
        let result = runner()
            .run(&work_tabs_workflow(), Some("us"), HashMap::new(), &ctrl, false)
            .await;

        assert!(matches!(result, Err(WorkflowError::Config(_))));
        // Nothing was touched before the region resolved
        assert!(ctrl.actions().is_empty());
    }

    #[tokio::test]
    async fn invalid_workflow_is_rejected_before_any_split() {
        let ctrl = RecordingControl::new();
        let workflow = WorkflowConfig {
            name: "broken".into(),
            steps: vec![StepConfig {
                name: "x".into(),
                step_type: StepType::Run,
                pane: Some("ghost".into()),
                command: Some("echo".into()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let result = runner()
            .run(&workflow, None, HashMap::new(), &ctrl, false)
            .await;

        assert!(matches!(result, Err(WorkflowError::Invalid { .. })));
        assert!(ctrl.actions().is_empty());
    }

    #[tokio::test]
    async fn failing_step_stops_the_walk() {
        let ctrl = RecordingControl::new();
        let workflow = WorkflowConfig {
            name: "halts".into(),
            steps: vec![
                StepConfig {
                    name: "bad".into(),
                    step_type: StepType::Run,
                    pane: Some("main".into()),
                    command: Some("{{ args.missing }}".into()),
                    ..Default::default()
                },
                StepConfig {
                    name: "never".into(),
                    step_type: StepType::Run,
                    pane: Some("main".into()),
                    command: Some("echo unreachable".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let summary = runner()
            .run(&workflow, None, HashMap::new(), &ctrl, false)
            .await
            .unwrap();

        assert!(!summary.success);
        assert_eq!(summary.failed_steps(), vec!["bad"]);
        assert!(summary.outcome("never").is_none());
        assert!(ctrl.sent_text(&PaneId::new("p0")).is_empty());
    }

    #[tokio::test]
    async fn continue_on_error_keeps_walking() {
        let ctrl = RecordingControl::new();
        let workflow = WorkflowConfig {
            name: "tolerant".into(),
            steps: vec![
                StepConfig {
                    name: "bad".into(),
                    step_type: StepType::Run,
                    pane: Some("main".into()),
                    command: Some("{{ args.missing }}".into()),
                    continue_on_error: true,
                    ..Default::default()
                },
                StepConfig {
                    name: "after".into(),
                    step_type: StepType::Run,
                    pane: Some("main".into()),
                    command: Some("echo still here".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let summary = runner()
            .run(&workflow, None, HashMap::new(), &ctrl, false)
            .await
            .unwrap();

        assert!(summary.success);
        assert_eq!(summary.failed_steps(), vec!["bad"]);
        assert_eq!(
            ctrl.sent_text(&PaneId::new("p0")),
            vec!["echo still here"]
        );
    }

    #[tokio::test]
    async fn staged_command_fires_on_commit() {
        let ctrl = RecordingControl::new();
        let workflow = WorkflowConfig {
            name: "staged".into(),
            steps: vec![
                StepConfig {
                    name: "stage-console".into(),
                    step_type: StepType::Stage,
                    pane: Some("main".into()),
                    command: Some("tanda-console".into()),
                    ..Default::default()
                },
                StepConfig {
                    name: "console".into(),
                    step_type: StepType::Commit,
                    pane: Some("main".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let summary = runner()
            .run(&workflow, None, HashMap::new(), &ctrl, false)
            .await
            .unwrap();
        assert!(summary.success);

        let actions = ctrl.actions();
        let stage_idx = actions
            .iter()
            .position(|a| matches!(a, Action::SendText { commit: false, .. }))
            .unwrap();
        let commit_idx = actions
            .iter()
            .position(|a| matches!(a, Action::Commit { .. }))
            .unwrap();
        assert!(stage_idx < commit_idx);
    }

    #[tokio::test]
    async fn dry_run_skips_wait_but_records_sends() {
        let ctrl = RecordingControl::new();
        let workflow = WorkflowConfig {
            name: "gated".into(),
            steps: vec![
                StepConfig {
                    name: "server".into(),
                    step_type: StepType::Run,
                    pane: Some("main".into()),
                    command: Some("tanda-server".into()),
                    ..Default::default()
                },
                StepConfig {
                    name: "ready".into(),
                    step_type: StepType::Wait,
                    pane: Some("main".into()),
                    markers: vec!["Listening on".into()],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let summary = runner()
            .run(&workflow, None, HashMap::new(), &ctrl, true)
            .await
            .unwrap();

        assert!(summary.success);
        assert_eq!(
            summary.outcome("ready").unwrap().status,
            crate::workflow::StepStatus::Skipped
        );
        assert_eq!(ctrl.sent_text(&PaneId::new("p0")), vec!["tanda-server"]);
    }

    #[tokio::test]
    async fn args_flow_into_commands() {
        let ctrl = RecordingControl::new();
        let workflow = WorkflowConfig {
            name: "args".into(),
            steps: vec![StepConfig {
                name: "checkout".into(),
                step_type: StepType::Run,
                pane: Some("main".into()),
                command: Some("git checkout {{ args.branch }}".into()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let args = HashMap::from([("branch".to_string(), "release".to_string())]);
        let summary = runner()
            .run(&workflow, None, args, &ctrl, false)
            .await
            .unwrap();

        assert!(summary.success);
        assert_eq!(
            ctrl.sent_text(&PaneId::new("p0")),
            vec!["git checkout release"]
        );
    }
}
