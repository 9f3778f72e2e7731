//! Supervision of external typing-tool invocations
//!
//! A typing child process is always run under a timeout, and its PID is
//! parked in a shared slot so a cancellation arriving from another
//! execution context can kill it instead of waiting out the run.

use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::application::ports::BackendError;

/// Upper bound on one tool invocation, one-shot whole-buffer runs included
const TOOL_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Run `command` to completion under the tool timeout.
///
/// The child's PID lives in `pid_slot` for the duration of the wait so
/// `kill_outstanding` can reach it; the slot is zeroed before returning.
pub(crate) async fn run_tool(
    mut command: Command,
    tool: &'static str,
    pid_slot: &AtomicU32,
) -> Result<(), BackendError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| BackendError::SpawnFailed {
        tool,
        reason: e.to_string(),
    })?;
    pid_slot.store(child.id().unwrap_or(0), Ordering::SeqCst);

    let waited = tokio::time::timeout(
        Duration::from_millis(TOOL_WAIT_TIMEOUT_MS),
        child.wait_with_output(),
    )
    .await;
    pid_slot.store(0, Ordering::SeqCst);

    match waited {
        // Timeout dropped the child future; kill_on_drop reaps it
        Err(_) => Err(BackendError::Timeout { tool }),
        Ok(Err(e)) => Err(BackendError::SpawnFailed {
            tool,
            reason: e.to_string(),
        }),
        Ok(Ok(output)) if output.status.success() => Ok(()),
        Ok(Ok(output)) => Err(BackendError::CommandFailed {
            tool,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
    }
}

/// Best-effort SIGKILL of the invocation recorded in `pid_slot`.
///
/// Safe to call from any context; does nothing when no child is
/// outstanding.
pub(crate) fn kill_outstanding(pid_slot: &AtomicU32) {
    let pid = pid_slot.swap(0, Ordering::SeqCst);
    if pid == 0 {
        return;
    }

    debug!(pid, "killing outstanding typing child");
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        warn!(pid, error = %e, "failed to kill typing child");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_is_ok() {
        let mut command = Command::new("true");
        command.arg("ignored");
        let slot = AtomicU32::new(0);

        assert!(run_tool(command, "true", &slot).await.is_ok());
        assert_eq!(slot.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_command_reports_status() {
        let command = Command::new("false");
        let slot = AtomicU32::new(0);

        let err = run_tool(command, "false", &slot).await.unwrap_err();
        assert!(matches!(err, BackendError::CommandFailed { tool: "false", .. }));
    }

    #[tokio::test]
    async fn missing_binary_reports_spawn_failure() {
        let command = Command::new("ghosttype-no-such-tool");
        let slot = AtomicU32::new(0);

        let err = run_tool(command, "ghosttype-no-such-tool", &slot)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn stderr_is_captured_on_failure() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo boom >&2; exit 3"]);
        let slot = AtomicU32::new(0);

        let err = run_tool(command, "sh", &slot).await.unwrap_err();
        match err {
            BackendError::CommandFailed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn kill_outstanding_with_empty_slot_is_a_no_op() {
        let slot = AtomicU32::new(0);
        kill_outstanding(&slot);
        assert_eq!(slot.load(Ordering::SeqCst), 0);
    }
}
