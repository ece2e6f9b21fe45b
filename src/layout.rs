//! Pane layout builder
//!
//! A workflow declares its layout as a root pane plus an ordered list of
//! splits, each naming the pane it splits off from. Building the layout
//! walks that list against a [`TerminalControl`] and returns a map from
//! pane name to pane handle for the dispatcher to target.

use crate::terminal::{PaneId, SplitDirection, TerminalControl, TerminalError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Declared pane layout for a workflow.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    /// Name of the pane the new tab starts with.
    #[serde(default = "default_root")]
    pub root: String,

    /// Splits applied in declaration order.
    #[serde(default)]
    pub splits: Vec<SplitSpec>,
}

fn default_root() -> String {
    "main".into()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            splits: Vec::new(),
        }
    }
}

/// One split: carve `name` out of the pane called `from`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SplitSpec {
    pub name: String,
    pub from: String,
    pub direction: SplitDirection,

    /// Resize the new pane to roughly this many rows. Cosmetic.
    pub rows: Option<u16>,
}

impl LayoutConfig {
    /// All pane names this layout declares, root first.
    pub fn pane_names(&self) -> Vec<&str> {
        let mut names = vec![self.root.as_str()];
        names.extend(self.splits.iter().map(|s| s.name.as_str()));
        names
    }

    /// Collect structural problems: duplicate pane names, splits sourced
    /// from panes that do not exist yet at that point in the sequence.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut known: Vec<&str> = vec![self.root.as_str()];
        for split in &self.splits {
            if known.contains(&split.name.as_str()) {
                errors.push(format!("duplicate pane name: {}", split.name));
            }
            if !known.contains(&split.from.as_str()) {
                errors.push(format!(
                    "split '{}' is from undeclared pane '{}'",
                    split.name, split.from
                ));
            }
            known.push(split.name.as_str());
        }

        errors
    }
}

/// Name-to-handle map produced by [`build`].
#[derive(Debug, Default)]
pub struct PaneMap {
    panes: HashMap<String, PaneId>,
}

impl PaneMap {
    pub fn get(&self, name: &str) -> Option<&PaneId> {
        self.panes.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, pane: PaneId) {
        self.panes.insert(name.into(), pane);
    }

    pub fn len(&self) -> usize {
        self.panes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }
}

/// Errors while building a layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("terminal error: {0}")]
    Terminal(#[from] TerminalError),

    #[error("split '{split}' is from undeclared pane '{from}'")]
    UnknownSource { split: String, from: String },
}

/// Build the layout against a terminal, returning the pane map.
pub async fn build(
    ctrl: &dyn TerminalControl,
    layout: &LayoutConfig,
) -> Result<PaneMap, LayoutError> {
    let mut panes = PaneMap::default();

    let root = ctrl.create_tab().await?;
    tracing::info!(pane = %root, name = %layout.root, "created root pane");
    panes.insert(layout.root.clone(), root);

    for split in &layout.splits {
        let from = panes
            .get(&split.from)
            .ok_or_else(|| LayoutError::UnknownSource {
                split: split.name.clone(),
                from: split.from.clone(),
            })?;

        let pane = ctrl.split(from, split.direction).await?;
        tracing::info!(pane = %pane, name = %split.name, from = %split.from, "split pane");

        if let Some(rows) = split.rows {
            // Resizing is a cosmetic preference; a backend that rejects it
            // must not sink the run.
            if let Err(e) = ctrl.resize(&pane, rows).await {
                tracing::warn!(pane = %pane, rows, error = %e, "resize failed, continuing");
            }
        }

        panes.insert(split.name.clone(), pane);
    }

    Ok(panes)
}
