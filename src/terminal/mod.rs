//! Terminal control abstraction
//!
//! Workflow logic never talks to a terminal host directly; it goes through
//! [`TerminalControl`] so runs are testable without a live terminal. Two
//! implementations exist: [`TmuxControl`] drives a real tmux server, and
//! [`RecordingControl`] is an in-memory double that also backs `--dry-run`.

mod recording;
mod tmux;

pub use recording::{Action, RecordingControl};
pub use tmux::TmuxControl;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle for a single terminal pane.
///
/// For tmux this wraps the `%N` pane id; other backends mint their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaneId(String);

impl PaneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PaneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a new pane lands relative to the pane being split.
///
/// Named by orientation rather than "vertical"/"horizontal", which mean
/// opposite things in different terminal hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    /// New pane to the right of the source pane.
    Right,
    /// New pane below the source pane.
    Below,
}

/// Errors from a terminal backend
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{command} exited with code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("unknown pane: {0}")]
    UnknownPane(PaneId),

    #[error("terminal backend unavailable: {0}")]
    Unavailable(String),
}

/// The small surface of the terminal host that workflows need.
///
/// Implementations take `&self`; backends with mutable state use interior
/// mutability so a single control can be shared across steps.
#[async_trait]
pub trait TerminalControl: Send + Sync {
    /// Create a fresh tab and return its initial pane.
    async fn create_tab(&self) -> Result<PaneId, TerminalError>;

    /// Split an existing pane. Every split yields a new distinct handle.
    async fn split(
        &self,
        pane: &PaneId,
        direction: SplitDirection,
    ) -> Result<PaneId, TerminalError>;

    /// Send literal text to a pane. With `commit` the text is executed
    /// (trailing newline); without it the text stays staged in the input
    /// buffer until [`TerminalControl::commit`] fires it.
    async fn send_text(
        &self,
        pane: &PaneId,
        text: &str,
        commit: bool,
    ) -> Result<(), TerminalError>;

    /// Send a bare newline, triggering whatever is staged in the pane.
    async fn commit(&self, pane: &PaneId) -> Result<(), TerminalError>;

    /// Read the pane's currently rendered screen contents.
    async fn read_text(&self, pane: &PaneId) -> Result<String, TerminalError>;

    /// Activate a pane so the user's keyboard goes there.
    async fn focus(&self, pane: &PaneId) -> Result<(), TerminalError>;

    /// Resize a pane to roughly `rows` lines. Cosmetic; callers are expected
    /// to tolerate failure.
    async fn resize(&self, pane: &PaneId, rows: u16) -> Result<(), TerminalError>;
}
