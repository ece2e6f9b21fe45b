//! Step execution logic

use super::state::StepOutcome;
use crate::config::{RegionConfig, StepConfig, StepType};
use crate::layout::PaneMap;
use crate::process;
use crate::template::{TemplateContext, TemplateEngine, TemplateError};
use crate::terminal::{PaneId, TerminalControl, TerminalError};
use crate::watch::{self, WaitOptions, WatchError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors during step execution
#[derive(Debug, Error)]
pub enum StepError {
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("terminal error: {0}")]
    Terminal(#[from] TerminalError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("step '{step}' targets undeclared pane '{pane}'")]
    UnknownPane { step: String, pane: String },

    #[error("missing required field '{field}' for step '{step}'")]
    MissingField { step: String, field: String },

    #[error("failed to open {url}: {source}")]
    Open {
        url: String,
        source: std::io::Error,
    },
}

/// Everything a step needs to run
pub struct ExecutionContext<'a> {
    pub ctrl: &'a dyn TerminalControl,
    pub panes: &'a PaneMap,
    pub region: &'a RegionConfig,
    pub engine: &'a TemplateEngine,
    pub template_ctx: &'a TemplateContext,
    pub wait_defaults: WaitOptions,
    /// Dry runs skip steps that would block on or leave the terminal
    pub dry_run: bool,
}

impl ExecutionContext<'_> {
    fn pane(&self, step: &StepConfig) -> Result<&PaneId, StepError> {
        let name = step.pane.as_ref().ok_or_else(|| StepError::MissingField {
            step: step.name.clone(),
            field: "pane".into(),
        })?;
        self.panes.get(name).ok_or_else(|| StepError::UnknownPane {
            step: step.name.clone(),
            pane: name.clone(),
        })
    }

    fn command(&self, step: &StepConfig) -> Result<String, StepError> {
        let command = step
            .command
            .as_ref()
            .ok_or_else(|| StepError::MissingField {
                step: step.name.clone(),
                field: "command".into(),
            })?;
        Ok(self.engine.render(command, self.template_ctx)?)
    }
}

/// Execute a single step
pub async fn execute_step(
    step: &StepConfig,
    ctx: &ExecutionContext<'_>,
) -> Result<StepOutcome, StepError> {
    let start = Instant::now();

    let outcome = match step.step_type {
        StepType::Run => {
            let pane = ctx.pane(step)?;
            let command = ctx.command(step)?;
            ctx.ctrl.send_text(pane, &command, true).await?;
            StepOutcome::ok(&step.name, Some(command), elapsed_ms(start))
        }

        StepType::Stage => {
            let pane = ctx.pane(step)?;
            let command = ctx.command(step)?;
            ctx.ctrl.send_text(pane, &command, false).await?;
            StepOutcome::ok(
                &step.name,
                Some(format!("staged: {command}")),
                elapsed_ms(start),
            )
        }

        StepType::Commit => {
            let pane = ctx.pane(step)?;
            ctx.ctrl.commit(pane).await?;
            StepOutcome::ok(&step.name, None, elapsed_ms(start))
        }

        StepType::Wait => {
            if ctx.dry_run {
                return Ok(StepOutcome::skipped(&step.name, "wait skipped (dry-run)"));
            }
            let pane = ctx.pane(step)?;
            let opts = wait_options(step, ctx.wait_defaults);
            watch::wait_for_markers(ctx.ctrl, pane, &step.markers, opts).await?;
            StepOutcome::ok(
                &step.name,
                Some(format!("matched {:?}", step.markers)),
                elapsed_ms(start),
            )
        }

        StepType::Export => {
            let pane = ctx.pane(step)?;
            let statements = ctx.region.export_statements();
            for statement in &statements {
                ctx.ctrl.send_text(pane, statement, true).await?;
            }
            StepOutcome::ok(
                &step.name,
                Some(format!("{} exports", statements.len())),
                elapsed_ms(start),
            )
        }

        StepType::Focus => {
            let pane = ctx.pane(step)?;
            ctx.ctrl.focus(pane).await?;
            StepOutcome::ok(&step.name, None, elapsed_ms(start))
        }

        StepType::Open => {
            let url = step.url.as_ref().ok_or_else(|| StepError::MissingField {
                step: step.name.clone(),
                field: "url".into(),
            })?;
            let url = ctx.engine.render(url, ctx.template_ctx)?;
            if ctx.dry_run {
                return Ok(StepOutcome::skipped(
                    &step.name,
                    format!("open skipped (dry-run): {url}"),
                ));
            }
            process::spawn_detached(process::opener_program(), &[&url]).map_err(|source| {
                StepError::Open {
                    url: url.clone(),
                    source,
                }
            })?;
            StepOutcome::ok(&step.name, Some(url), elapsed_ms(start))
        }
    };

    Ok(outcome)
}

fn wait_options(step: &StepConfig, defaults: WaitOptions) -> WaitOptions {
    match step.timeout_secs {
        Some(0) => defaults.with_timeout(None),
        Some(secs) => defaults.with_timeout(Some(Duration::from_secs(secs))),
        None => defaults,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
