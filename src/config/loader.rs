//! Configuration loading with multi-layer merge

use super::{RegionConfig, WorkflowConfig, builtin_regions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Built-in workflows, embedded so a fresh install can run without any
/// config files. Project and user workflow files with the same name win.
const BUILTIN_WORK_TABS: &str = include_str!("../../builtin/work-tabs.toml");
const BUILTIN_DEV_STACK: &str = include_str!("../../builtin/dev-stack.toml");

pub fn builtin_workflows() -> [(&'static str, &'static str); 2] {
    [
        ("work-tabs", BUILTIN_WORK_TABS),
        ("dev-stack", BUILTIN_DEV_STACK),
    ]
}

/// Errors resolving configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown region '{name}', known regions: {known:?}")]
    UnknownRegion { name: String, known: Vec<String> },
}

/// Top-level worktabs configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorktabsConfig {
    /// Global defaults
    #[serde(default)]
    pub defaults: Defaults,

    /// Region definitions
    #[serde(default)]
    pub regions: HashMap<String, RegionConfig>,
}

impl Default for WorktabsConfig {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            regions: builtin_regions(),
        }
    }
}

/// Global default settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Region used when --region is not given
    #[serde(default = "default_region")]
    pub region: String,

    /// tmux session the panes are created in
    #[serde(default = "default_session")]
    pub session: String,

    /// Screen polling interval for wait steps, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Default wait-step timeout in seconds; 0 waits forever
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    /// Extra directory to search for workflow files (`~` is expanded)
    pub workflows_dir: Option<String>,
}

fn default_region() -> String {
    "au".into()
}

fn default_session() -> String {
    "worktabs".into()
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_wait_timeout_secs() -> u64 {
    120
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            region: default_region(),
            session: default_session(),
            poll_interval_ms: default_poll_interval_ms(),
            wait_timeout_secs: default_wait_timeout_secs(),
            workflows_dir: None,
        }
    }
}

impl WorktabsConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults (including the au/eu regions)
    /// 2. ~/.config/worktabs/config.toml
    /// 3. .worktabs/config.toml (project)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                let user_config = Self::load_file(&user_config_path)
                    .with_context(|| format!("loading {}", user_config_path.display()))?;
                config.merge(user_config);
            }
        }

        let project_config_path = project_dir
            .map(|p| p.join(".worktabs/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".worktabs/config.toml"));

        if project_config_path.exists() {
            let project_config = Self::load_file(&project_config_path)
                .with_context(|| format!("loading {}", project_config_path.display()))?;
            config.merge(project_config);
        }

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Get the user config path (~/.config/worktabs/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("worktabs/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.defaults.region != default_region() {
            self.defaults.region = other.defaults.region;
        }
        if other.defaults.session != default_session() {
            self.defaults.session = other.defaults.session;
        }
        if other.defaults.poll_interval_ms != default_poll_interval_ms() {
            self.defaults.poll_interval_ms = other.defaults.poll_interval_ms;
        }
        if other.defaults.wait_timeout_secs != default_wait_timeout_secs() {
            self.defaults.wait_timeout_secs = other.defaults.wait_timeout_secs;
        }
        if other.defaults.workflows_dir.is_some() {
            self.defaults.workflows_dir = other.defaults.workflows_dir;
        }

        // Merge regions (other wins for same key)
        for (name, region) in other.regions {
            self.regions.insert(name, region);
        }
    }

    /// Resolve a region by name; the error lists what would have worked.
    pub fn region(&self, name: &str) -> Result<&RegionConfig, ConfigError> {
        self.regions.get(name).ok_or_else(|| {
            let mut known: Vec<String> = self.regions.keys().cloned().collect();
            known.sort();
            ConfigError::UnknownRegion {
                name: name.to_string(),
                known,
            }
        })
    }

    /// Wait options derived from the defaults.
    pub fn wait_options(&self) -> crate::watch::WaitOptions {
        crate::watch::WaitOptions {
            poll_interval: std::time::Duration::from_millis(self.defaults.poll_interval_ms),
            timeout: match self.defaults.wait_timeout_secs {
                0 => None,
                secs => Some(std::time::Duration::from_secs(secs)),
            },
        }
    }
}

/// Load a workflow from the standard hierarchy
///
/// Search order (first match wins):
/// 1. .worktabs/workflows/{name}.toml (project)
/// 2. defaults.workflows_dir (if configured)
/// 3. ~/.config/worktabs/workflows/{name}.toml (user)
/// 4. Built-in workflows (embedded)
pub fn load_workflow(
    name: &str,
    project_dir: Option<&Path>,
    extra_dir: Option<&str>,
) -> Result<WorkflowConfig> {
    let filename = format!("{}.toml", name);

    let project_path = project_dir
        .map(|p| p.join(".worktabs/workflows").join(&filename))
        .unwrap_or_else(|| PathBuf::from(".worktabs/workflows").join(&filename));

    if project_path.exists() {
        return load_workflow_file(&project_path);
    }

    if let Some(dir) = extra_dir {
        let expanded = shellexpand::tilde(dir);
        let extra_path = Path::new(expanded.as_ref()).join(&filename);
        if extra_path.exists() {
            return load_workflow_file(&extra_path);
        }
    }

    if let Some(user_dir) = dirs::config_dir() {
        let user_path = user_dir.join("worktabs/workflows").join(&filename);
        if user_path.exists() {
            return load_workflow_file(&user_path);
        }
    }

    for (builtin_name, contents) in builtin_workflows() {
        if builtin_name == name {
            return parse_workflow(contents, &format!("builtin workflow '{}'", name));
        }
    }

    anyhow::bail!("workflow '{}' not found", name)
}

/// List available workflows as (name, source) pairs, first match winning.
pub fn list_workflows(project_dir: Option<&Path>, extra_dir: Option<&str>) -> Vec<(String, String)> {
    let mut seen = std::collections::HashSet::new();
    let mut found = Vec::new();

    let mut scan = |dir: PathBuf, source: &str| {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return;
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|e| {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    path.file_stem().map(|s| s.to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        for name in names {
            if seen.insert(name.clone()) {
                found.push((name, source.to_string()));
            }
        }
    };

    let project_workflows = project_dir
        .map(|p| p.join(".worktabs/workflows"))
        .unwrap_or_else(|| PathBuf::from(".worktabs/workflows"));
    scan(project_workflows, "project");

    if let Some(dir) = extra_dir {
        let expanded = shellexpand::tilde(dir);
        scan(PathBuf::from(expanded.as_ref()), "configured dir");
    }

    if let Some(user_dir) = dirs::config_dir() {
        scan(user_dir.join("worktabs/workflows"), "user");
    }

    for (name, _) in builtin_workflows() {
        if seen.insert(name.to_string()) {
            found.push((name.to_string(), "builtin".to_string()));
        }
    }

    found
}

fn load_workflow_file(path: &Path) -> Result<WorkflowConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_workflow(&contents, &path.display().to_string())
}

fn parse_workflow(contents: &str, origin: &str) -> Result<WorkflowConfig> {
    let workflow: WorkflowConfig =
        toml::from_str(contents).with_context(|| format!("parsing {}", origin))?;

    workflow.validate().map_err(|errors| {
        anyhow::anyhow!(
            "workflow validation failed:\n  {}",
            errors.join("\n  ")
        )
    })?;

    Ok(workflow)
}
