//! Subprocess plumbing shared by the tmux backend and the URL opener.

use std::process::Stdio;
use tokio::process::Command;

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

fn exit_status_code_parts(code: Option<i32>, _signal: Option<i32>) -> Option<i32> {
    if let Some(code) = code {
        return Some(code);
    }
    #[cfg(unix)]
    {
        if let Some(signal) = _signal {
            return Some(128 + signal);
        }
    }
    None
}

/// Extract exit code from ExitStatus, using 128+signal for signal-terminated
/// processes on Unix.
pub(crate) fn exit_status_code(status: &std::process::ExitStatus) -> Option<i32> {
    let code = status.code();
    #[cfg(unix)]
    let signal = status.signal();
    #[cfg(not(unix))]
    let signal = None;
    exit_status_code_parts(code, signal)
}

/// Captured output of a finished subprocess.
#[derive(Debug)]
pub(crate) struct CmdOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Run a command to completion, capturing both streams.
pub(crate) async fn run_capture(program: &str, args: &[&str]) -> std::io::Result<CmdOutput> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    Ok(CmdOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        code: exit_status_code(&output.status),
    })
}

/// Platform command for opening a URL in the default browser.
pub(crate) fn opener_program() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "cmd"
    } else {
        "xdg-open"
    }
}

/// Launch a process without waiting for it (browser auth etc.). The child
/// outlives us; its output goes nowhere.
pub(crate) fn spawn_detached(program: &str, args: &[&str]) -> std::io::Result<()> {
    std::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_passthrough() {
        assert_eq!(exit_status_code_parts(Some(0), None), Some(0));
        assert_eq!(exit_status_code_parts(Some(1), None), Some(1));
        assert_eq!(exit_status_code_parts(Some(255), None), Some(255));
    }

    #[cfg(unix)]
    #[test]
    fn signal_exit_code() {
        // SIGKILL (9) -> 137, SIGTERM (15) -> 143
        assert_eq!(exit_status_code_parts(None, Some(9)), Some(137));
        assert_eq!(exit_status_code_parts(None, Some(15)), Some(143));
    }

    #[cfg(not(unix))]
    #[test]
    fn signal_ignored_on_non_unix() {
        assert_eq!(exit_status_code_parts(None, Some(9)), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_capture_collects_both_streams() {
        let out = run_capture("sh", &["-c", "printf 'out'; printf 'err' >&2"])
            .await
            .unwrap();
        assert_eq!(out.stdout, "out");
        assert_eq!(out.stderr, "err");
        assert!(out.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_capture_nonzero_exit() {
        let out = run_capture("sh", &["-c", "exit 42"]).await.unwrap();
        assert_eq!(out.code, Some(42));
        assert!(!out.success());
    }

    #[test]
    fn opener_is_known() {
        assert!(["open", "xdg-open", "cmd"].contains(&opener_program()));
    }
}
