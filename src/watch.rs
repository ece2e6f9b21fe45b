//! Text-wait primitive
//!
//! Blocks a workflow until a pane's rendered output contains a marker
//! string. The screen is checked once up front so a marker that was printed
//! before we started watching is seen immediately, then polled on an
//! interval. Waits are bounded by a timeout unless explicitly disabled; a
//! marker that never shows up surfaces as an error instead of hanging the
//! run.

use crate::terminal::{PaneId, TerminalControl, TerminalError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Polling knobs for [`wait_for_markers`].
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// How often to re-read the screen.
    pub poll_interval: Duration,
    /// Upper bound on the wait for each marker. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl WaitOptions {
    /// Same options with a different timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Errors while watching a pane.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("terminal error while waiting: {0}")]
    Terminal(#[from] TerminalError),

    #[error("timed out after {waited:?} waiting for {marker:?}")]
    TimedOut { marker: String, waited: Duration },
}

/// Wait until the pane's screen contains each marker, in order.
///
/// Markers are plain substrings. Most workflows use one or two ("server
/// booted", then "listening"); any non-empty list works.
pub async fn wait_for_markers(
    ctrl: &dyn TerminalControl,
    pane: &PaneId,
    markers: &[String],
    opts: WaitOptions,
) -> Result<(), WatchError> {
    for marker in markers {
        wait_for_marker(ctrl, pane, marker, opts).await?;
    }
    Ok(())
}

async fn wait_for_marker(
    ctrl: &dyn TerminalControl,
    pane: &PaneId,
    marker: &str,
    opts: WaitOptions,
) -> Result<(), WatchError> {
    let started = Instant::now();

    loop {
        let screen = ctrl.read_text(pane).await?;
        if screen.contains(marker) {
            tracing::debug!(pane = %pane, marker, waited = ?started.elapsed(), "marker found");
            return Ok(());
        }

        if let Some(timeout) = opts.timeout {
            if started.elapsed() >= timeout {
                return Err(WatchError::TimedOut {
                    marker: marker.to_string(),
                    waited: started.elapsed(),
                });
            }
        }

        tokio::time::sleep(opts.poll_interval).await;
    }
}
