//! Command template rendering
//!
//! Workflow commands and URLs are Jinja-style templates rendered against
//! the selected region and the run's arguments:
//!
//! - `{{ region.ssh }}`, `{{ region.sync }}`, `{{ region.vars.host }}`
//! - `{{ args.branch }}` for `key=value` arguments passed on the CLI
//! - `{{ workflow }}` for the workflow name
//!
//! Undefined variables are hard errors; a typo in a command template should
//! fail the run before anything is sent to a pane. A `shell_escape` filter
//! is available for argument values that end up inside shell commands.

use crate::config::RegionConfig;
use minijinja::{Environment, UndefinedBehavior, context, value::Value};
use std::collections::HashMap;
use thiserror::Error;

/// Rendering failure, carrying the offending template text.
#[derive(Debug, Error)]
#[error("template error in {template:?}: {source}")]
pub struct TemplateError {
    pub template: String,
    #[source]
    pub source: minijinja::Error,
}

/// Variables available to a workflow's command templates.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    workflow: String,
    region_name: String,
    region: RegionConfig,
    args: HashMap<String, String>,
}

impl TemplateContext {
    pub fn new(
        workflow: impl Into<String>,
        region_name: impl Into<String>,
        region: &RegionConfig,
        args: HashMap<String, String>,
    ) -> Self {
        Self {
            workflow: workflow.into(),
            region_name: region_name.into(),
            region: region.clone(),
            args,
        }
    }

    fn to_value(&self) -> Value {
        context! {
            workflow => self.workflow,
            region => context! {
                name => self.region_name,
                ssh => self.region.ssh,
                sync => self.region.sync,
                vars => Value::from_serialize(&self.region.vars),
            },
            args => Value::from_serialize(&self.args),
        }
    }
}

/// Wrapper around a configured minijinja environment.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_filter("shell_escape", shell_escape);
        Self { env }
    }

    /// Render a template string against the context.
    pub fn render(&self, template: &str, ctx: &TemplateContext) -> Result<String, TemplateError> {
        self.env
            .render_str(template, ctx.to_value())
            .map_err(|source| TemplateError {
                template: template.to_string(),
                source,
            })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-quote a value for the shell, escaping embedded quotes.
fn shell_escape(value: String) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
