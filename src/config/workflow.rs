//! Workflow and step configuration

use crate::layout::LayoutConfig;
use serde::{Deserialize, Serialize};

/// Step type - explicit, not inferred
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    /// Send a command and execute it (trailing newline)
    Run,
    /// Send a command but leave it staged in the input buffer
    Stage,
    /// Send a bare newline, firing a previously staged command
    Commit,
    /// Block until marker text appears in a pane
    Wait,
    /// Send the region's `export KEY=VALUE` statements
    Export,
    /// Activate a pane
    Focus,
    /// Open a URL in the default browser
    Open,
}

/// Configuration for a workflow step
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    /// Step name (unique within workflow)
    pub name: String,

    /// Step type
    #[serde(rename = "type")]
    pub step_type: StepType,

    /// Target pane (for everything except `open`)
    pub pane: Option<String>,

    /// Command template (for run/stage steps)
    pub command: Option<String>,

    /// Marker substrings to wait for, in order (for wait steps)
    #[serde(default)]
    pub markers: Vec<String>,

    /// URL template (for open steps)
    pub url: Option<String>,

    /// Per-step wait timeout override in seconds (for wait steps).
    /// 0 means wait forever.
    pub timeout_secs: Option<u64>,

    /// Continue the workflow if this step fails
    #[serde(default)]
    pub continue_on_error: bool,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            step_type: StepType::Run,
            pane: None,
            command: None,
            markers: Vec::new(),
            url: None,
            timeout_secs: None,
            continue_on_error: false,
        }
    }
}

/// Full workflow configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Workflow name
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Pane layout to build before the steps run
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Steps, executed in listed order
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

impl WorkflowConfig {
    /// Validate the workflow configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = self.layout.validate();

        // Duplicate step names
        let mut seen_names = std::collections::HashSet::new();
        for step in &self.steps {
            if !seen_names.insert(&step.name) {
                errors.push(format!("duplicate step name: {}", step.name));
            }
        }

        let pane_names = self.layout.pane_names();

        for step in &self.steps {
            // Pane references must point at declared panes
            if let Some(ref pane) = step.pane {
                if !pane_names.contains(&pane.as_str()) {
                    errors.push(format!(
                        "step '{}' targets undeclared pane '{}'",
                        step.name, pane
                    ));
                }
            }

            // Per-type required fields
            match step.step_type {
                StepType::Run | StepType::Stage => {
                    if step.command.is_none() {
                        errors.push(format!(
                            "{} step '{}' missing 'command' field",
                            type_name(step.step_type),
                            step.name
                        ));
                    }
                    if step.pane.is_none() {
                        errors.push(format!(
                            "{} step '{}' missing 'pane' field",
                            type_name(step.step_type),
                            step.name
                        ));
                    }
                }
                StepType::Commit | StepType::Focus | StepType::Export => {
                    if step.pane.is_none() {
                        errors.push(format!(
                            "{} step '{}' missing 'pane' field",
                            type_name(step.step_type),
                            step.name
                        ));
                    }
                }
                StepType::Wait => {
                    if step.pane.is_none() {
                        errors.push(format!("wait step '{}' missing 'pane' field", step.name));
                    }
                    if step.markers.is_empty() {
                        errors.push(format!("wait step '{}' has no markers", step.name));
                    }
                }
                StepType::Open => {
                    if step.url.is_none() {
                        errors.push(format!("open step '{}' missing 'url' field", step.name));
                    }
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn type_name(step_type: StepType) -> &'static str {
    match step_type {
        StepType::Run => "run",
        StepType::Stage => "stage",
        StepType::Commit => "commit",
        StepType::Wait => "wait",
        StepType::Export => "export",
        StepType::Focus => "focus",
        StepType::Open => "open",
    }
}
