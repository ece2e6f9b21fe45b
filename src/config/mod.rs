//! Configuration types and loading for worktabs

mod loader;
mod region;
mod workflow;

pub use loader::{
    ConfigError, Defaults, WorktabsConfig, builtin_workflows, list_workflows, load_workflow,
};
pub use region::{RegionConfig, builtin_regions};
pub use workflow::{StepConfig, StepType, WorkflowConfig};
