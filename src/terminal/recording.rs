//! In-memory terminal backend for tests and dry runs
//!
//! Mints synthetic pane ids, records every action taken against it, and
//! serves scripted screen contents to the text-wait loop.

use super::{PaneId, SplitDirection, TerminalControl, TerminalError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// One recorded call against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateTab {
        pane: PaneId,
    },
    Split {
        from: PaneId,
        direction: SplitDirection,
        pane: PaneId,
    },
    SendText {
        pane: PaneId,
        text: String,
        commit: bool,
    },
    Commit {
        pane: PaneId,
    },
    Focus {
        pane: PaneId,
    },
    Resize {
        pane: PaneId,
        rows: u16,
    },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::CreateTab { pane } => write!(f, "create tab -> {pane}"),
            Action::Split {
                from,
                direction,
                pane,
            } => {
                let dir = match direction {
                    SplitDirection::Right => "right",
                    SplitDirection::Below => "below",
                };
                write!(f, "split {from} {dir} -> {pane}")
            }
            Action::SendText { pane, text, commit } => {
                if *commit {
                    write!(f, "run in {pane}: {text}")
                } else {
                    write!(f, "stage in {pane}: {text}")
                }
            }
            Action::Commit { pane } => write!(f, "commit staged input in {pane}"),
            Action::Focus { pane } => write!(f, "focus {pane}"),
            Action::Resize { pane, rows } => write!(f, "resize {pane} to {rows} rows"),
        }
    }
}

#[derive(Default)]
struct Inner {
    next_id: u32,
    actions: Vec<Action>,
    screens: HashMap<PaneId, VecDeque<String>>,
    fail_resizes: bool,
}

impl Inner {
    fn mint(&mut self) -> PaneId {
        let pane = PaneId::new(format!("p{}", self.next_id));
        self.next_id += 1;
        pane
    }
}

/// Recording backend; see module docs.
#[derive(Default)]
pub struct RecordingControl {
    inner: Mutex<Inner>,
}

impl RecordingControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `resize` calls fail, for exercising the "resize is
    /// cosmetic" contract.
    pub fn fail_resizes(self) -> Self {
        self.inner.lock().unwrap().fail_resizes = true;
        self
    }

    /// Queue a screen snapshot for a pane. Each `read_text` consumes one
    /// snapshot; the final one is then served repeatedly, mimicking a pane
    /// whose output has settled.
    pub fn push_screen(&self, pane: &PaneId, screen: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .screens
            .entry(pane.clone())
            .or_default()
            .push_back(screen.into());
    }

    /// Everything recorded so far, in call order.
    pub fn actions(&self) -> Vec<Action> {
        self.inner.lock().unwrap().actions.clone()
    }

    /// Text sent to a pane via `send_text`, in order.
    pub fn sent_text(&self, pane: &PaneId) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .actions
            .iter()
            .filter_map(|a| match a {
                Action::SendText { pane: p, text, .. } if p == pane => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl TerminalControl for RecordingControl {
    async fn create_tab(&self) -> Result<PaneId, TerminalError> {
        let mut inner = self.inner.lock().unwrap();
        let pane = inner.mint();
        inner.actions.push(Action::CreateTab { pane: pane.clone() });
        Ok(pane)
    }

    async fn split(
        &self,
        pane: &PaneId,
        direction: SplitDirection,
    ) -> Result<PaneId, TerminalError> {
        let mut inner = self.inner.lock().unwrap();
        let new_pane = inner.mint();
        inner.actions.push(Action::Split {
            from: pane.clone(),
            direction,
            pane: new_pane.clone(),
        });
        Ok(new_pane)
    }

    async fn send_text(
        &self,
        pane: &PaneId,
        text: &str,
        commit: bool,
    ) -> Result<(), TerminalError> {
        self.inner.lock().unwrap().actions.push(Action::SendText {
            pane: pane.clone(),
            text: text.to_string(),
            commit,
        });
        Ok(())
    }

    async fn commit(&self, pane: &PaneId) -> Result<(), TerminalError> {
        self.inner
            .lock()
            .unwrap()
            .actions
            .push(Action::Commit { pane: pane.clone() });
        Ok(())
    }

    async fn read_text(&self, pane: &PaneId) -> Result<String, TerminalError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(queue) = inner.screens.get_mut(pane) else {
            return Ok(String::new());
        };
        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap_or_default())
        } else {
            Ok(queue.front().cloned().unwrap_or_default())
        }
    }

    async fn focus(&self, pane: &PaneId) -> Result<(), TerminalError> {
        self.inner
            .lock()
            .unwrap()
            .actions
            .push(Action::Focus { pane: pane.clone() });
        Ok(())
    }

    async fn resize(&self, pane: &PaneId, rows: u16) -> Result<(), TerminalError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_resizes {
            return Err(TerminalError::CommandFailed {
                command: "resize".into(),
                code: Some(1),
                stderr: "resize rejected".into(),
            });
        }
        inner.actions.push(Action::Resize {
            pane: pane.clone(),
            rows,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mints_distinct_pane_ids() {
        let ctrl = RecordingControl::new();
        let root = ctrl.create_tab().await.unwrap();
        let a = ctrl.split(&root, SplitDirection::Right).await.unwrap();
        let b = ctrl.split(&a, SplitDirection::Below).await.unwrap();

        assert_ne!(root, a);
        assert_ne!(root, b);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn records_sends_in_order() {
        let ctrl = RecordingControl::new();
        let pane = ctrl.create_tab().await.unwrap();

        ctrl.send_text(&pane, "tssh", true).await.unwrap();
        ctrl.send_text(&pane, "tanda-console", false).await.unwrap();
        ctrl.commit(&pane).await.unwrap();

        assert_eq!(ctrl.sent_text(&pane), vec!["tssh", "tanda-console"]);
        assert!(matches!(
            ctrl.actions().last(),
            Some(Action::Commit { .. })
        ));
    }

    #[tokio::test]
    async fn scripted_screens_settle_on_last() {
        let ctrl = RecordingControl::new();
        let pane = ctrl.create_tab().await.unwrap();

        ctrl.push_screen(&pane, "booting");
        ctrl.push_screen(&pane, "ready");

        assert_eq!(ctrl.read_text(&pane).await.unwrap(), "booting");
        assert_eq!(ctrl.read_text(&pane).await.unwrap(), "ready");
        // Settled: keeps serving the final snapshot
        assert_eq!(ctrl.read_text(&pane).await.unwrap(), "ready");
    }

    #[tokio::test]
    async fn unscripted_pane_reads_empty() {
        let ctrl = RecordingControl::new();
        let pane = ctrl.create_tab().await.unwrap();
        assert_eq!(ctrl.read_text(&pane).await.unwrap(), "");
    }
}
