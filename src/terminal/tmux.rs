//! tmux backend
//!
//! Drives a tmux server through its CLI. Panes are addressed by their `%N`
//! pane id, which stays stable however the user rearranges windows.

use super::{PaneId, SplitDirection, TerminalControl, TerminalError};
use crate::process;
use async_trait::async_trait;

const PANE_ID_FORMAT: &str = "#{pane_id}";

/// Terminal control backed by a tmux session.
pub struct TmuxControl {
    session: String,
}

impl TmuxControl {
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
        }
    }

    /// Report the installed tmux version, or an error if tmux is missing.
    pub async fn version() -> Result<String, TerminalError> {
        let out = run_tmux(&["-V"]).await?;
        Ok(out.trim().to_string())
    }

    async fn session_exists(&self) -> Result<bool, TerminalError> {
        // has-session exits nonzero for a missing session; that is an answer,
        // not a failure.
        let target = format!("={}", self.session);
        let out = process::run_capture("tmux", &["has-session", "-t", &target])
            .await
            .map_err(|e| TerminalError::Spawn {
                program: "tmux".into(),
                source: e,
            })?;
        Ok(out.success())
    }
}

async fn run_tmux(args: &[&str]) -> Result<String, TerminalError> {
    let out = process::run_capture("tmux", args)
        .await
        .map_err(|e| TerminalError::Spawn {
            program: "tmux".into(),
            source: e,
        })?;

    if !out.success() {
        return Err(TerminalError::CommandFailed {
            command: format!("tmux {}", args.join(" ")),
            code: out.code,
            stderr: out.stderr.trim().to_string(),
        });
    }

    Ok(out.stdout)
}

#[async_trait]
impl TerminalControl for TmuxControl {
    async fn create_tab(&self) -> Result<PaneId, TerminalError> {
        let pane = if self.session_exists().await? {
            run_tmux(&[
                "new-window",
                "-t",
                &self.session,
                "-P",
                "-F",
                PANE_ID_FORMAT,
            ])
            .await?
        } else {
            run_tmux(&[
                "new-session",
                "-d",
                "-s",
                &self.session,
                "-P",
                "-F",
                PANE_ID_FORMAT,
            ])
            .await?
        };

        let pane = PaneId::new(pane.trim());
        tracing::debug!(session = %self.session, pane = %pane, "created tab");
        Ok(pane)
    }

    async fn split(
        &self,
        pane: &PaneId,
        direction: SplitDirection,
    ) -> Result<PaneId, TerminalError> {
        let flag = match direction {
            SplitDirection::Right => "-h",
            SplitDirection::Below => "-v",
        };

        let out = run_tmux(&[
            "split-window",
            flag,
            "-t",
            pane.as_str(),
            "-P",
            "-F",
            PANE_ID_FORMAT,
        ])
        .await?;

        let new_pane = PaneId::new(out.trim());
        tracing::debug!(from = %pane, pane = %new_pane, ?direction, "split pane");
        Ok(new_pane)
    }

    async fn send_text(
        &self,
        pane: &PaneId,
        text: &str,
        commit: bool,
    ) -> Result<(), TerminalError> {
        // -l sends the text literally; "--" guards against text starting
        // with a dash.
        run_tmux(&["send-keys", "-t", pane.as_str(), "-l", "--", text]).await?;
        if commit {
            run_tmux(&["send-keys", "-t", pane.as_str(), "Enter"]).await?;
        }
        Ok(())
    }

    async fn commit(&self, pane: &PaneId) -> Result<(), TerminalError> {
        run_tmux(&["send-keys", "-t", pane.as_str(), "Enter"]).await?;
        Ok(())
    }

    async fn read_text(&self, pane: &PaneId) -> Result<String, TerminalError> {
        run_tmux(&["capture-pane", "-p", "-t", pane.as_str()]).await
    }

    async fn focus(&self, pane: &PaneId) -> Result<(), TerminalError> {
        run_tmux(&["select-pane", "-t", pane.as_str()]).await?;
        Ok(())
    }

    async fn resize(&self, pane: &PaneId, rows: u16) -> Result<(), TerminalError> {
        run_tmux(&["resize-pane", "-t", pane.as_str(), "-y", &rows.to_string()]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let out = process::run_capture("worktabs-definitely-not-a-binary", &[]).await;
        assert!(out.is_err());
    }
}
