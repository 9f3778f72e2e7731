//! ydotool daemon-socket backend
//!
//! Types through the `ydotool` client, which talks to a privileged
//! `ydotoold` daemon over a UNIX socket. The socket is discovered at
//! connect time (system-wide path first, then per-user) and pinned for
//! every later invocation; when neither exists, one detached daemon spawn
//! is attempted before giving up with path-specific remediation advice.

use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::AtomicU32;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::application::ports::{
    BackendError, BackendKind, InitError, InputBackend, UnitGranularity,
};

use super::probe;
use super::process::{kill_outstanding, run_tool};

/// Socket of a system-wide ydotoold service
const SYSTEM_SOCKET: &str = "/tmp/.ydotool_socket";

/// PATH probe budget for the client binary check
const PROBE_BUDGET_MS: u64 = 1000;

/// How long a freshly spawned daemon gets to create its socket
const DAEMON_SETTLE_MS: u64 = 500;
const DAEMON_SETTLE_POLL_MS: u64 = 100;

/// Backend invoking `ydotool type` against a pinned daemon socket
pub struct YdotoolBackend {
    socket_path: PathBuf,
    typing_pid: AtomicU32,
}

impl YdotoolBackend {
    /// Discover (or start) a reachable daemon and build the backend
    pub async fn connect() -> Result<Self, InitError> {
        if !probe::command_on_path("ydotool", PROBE_BUDGET_MS).await {
            return Err(InitError::ToolNotFound("ydotool"));
        }

        let candidates = socket_candidates();
        if let Some(path) = pick_existing(&candidates) {
            debug!(socket = %path.display(), "found existing ydotoold socket");
            return Ok(Self::bound_to(path));
        }

        // No daemon yet: one detached spawn attempt, then a bounded
        // settle wait before re-checking
        if spawn_daemon() {
            if let Some(expected) = candidates.last() {
                probe::wait_for_path(expected, DAEMON_SETTLE_MS, DAEMON_SETTLE_POLL_MS).await;
            }
            if let Some(path) = pick_existing(&candidates) {
                debug!(socket = %path.display(), "ydotoold socket appeared after spawn");
                return Ok(Self::bound_to(path));
            }
        }

        Err(unreachable_error(&candidates))
    }

    fn bound_to(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            typing_pid: AtomicU32::new(0),
        }
    }

    /// The daemon socket every invocation is pinned to
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

#[async_trait]
impl InputBackend for YdotoolBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DaemonSocket
    }

    fn granularity(&self) -> UnitGranularity {
        UnitGranularity::Text
    }

    async fn send_char(&self, ch: char) -> Result<bool, BackendError> {
        let mut buf = [0u8; 4];
        self.send_text(ch.encode_utf8(&mut buf)).await?;
        Ok(true)
    }

    async fn send_text(&self, text: &str) -> Result<(), BackendError> {
        let mut command = Command::new("ydotool");
        command
            .args(["type", "--", text])
            .env("YDOTOOL_SOCKET", &self.socket_path);
        run_tool(command, "ydotool", &self.typing_pid).await
    }

    fn cancel_outstanding(&self) {
        kill_outstanding(&self.typing_pid);
    }
}

/// Candidate socket paths in discovery order: system-wide service first,
/// then the per-user daemon.
fn socket_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(SYSTEM_SOCKET)];
    if let Some(dir) = std::env::var_os("XDG_RUNTIME_DIR") {
        candidates.push(PathBuf::from(dir).join(".ydotool_socket"));
    }
    candidates
}

fn pick_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.exists()).cloned()
}

/// Spawn `ydotoold` as a detached user process. At most one attempt per
/// `connect()` call.
fn spawn_daemon() -> bool {
    let mut command = std::process::Command::new("ydotoold");
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0);

    match command.spawn() {
        Ok(child) => {
            debug!(pid = child.id(), "spawned detached ydotoold");
            true
        }
        Err(e) => {
            warn!(error = %e, "failed to spawn ydotoold");
            false
        }
    }
}

/// Build the failure with remediation advice matching the path that was
/// expected to work.
fn unreachable_error(candidates: &[PathBuf]) -> InitError {
    // With a runtime dir the per-user daemon is the expected provider;
    // otherwise only the system service socket could exist
    if candidates.len() > 1 {
        InitError::DaemonUnreachable {
            socket: candidates[1].display().to_string(),
            hint: "Run ydotoold as your user and make sure your account is in the input group."
                .to_string(),
        }
    } else {
        InitError::DaemonUnreachable {
            socket: SYSTEM_SOCKET.to_string(),
            hint: "Enable the daemon with `systemctl enable --now ydotool.service`.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_socket_is_checked_first() {
        let candidates = socket_candidates();
        assert_eq!(candidates[0], PathBuf::from(SYSTEM_SOCKET));
    }

    #[test]
    fn pick_existing_respects_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        std::fs::File::create(&first).unwrap();
        std::fs::File::create(&second).unwrap();

        let picked = pick_existing(&[first.clone(), second]).unwrap();
        assert_eq!(picked, first);
    }

    #[test]
    fn pick_existing_skips_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let present = dir.path().join("present");
        std::fs::File::create(&present).unwrap();

        let picked = pick_existing(&[missing, present.clone()]).unwrap();
        assert_eq!(picked, present);
    }

    #[test]
    fn pick_existing_returns_none_when_nothing_exists() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(pick_existing(&[dir.path().join("nope")]), None);
    }

    #[test]
    fn unreachable_error_mentions_user_daemon_when_runtime_dir_known() {
        let candidates = vec![
            PathBuf::from(SYSTEM_SOCKET),
            PathBuf::from("/run/user/1000/.ydotool_socket"),
        ];
        match unreachable_error(&candidates) {
            InitError::DaemonUnreachable { socket, hint } => {
                assert!(socket.contains("/run/user/1000"));
                assert!(hint.contains("input group"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unreachable_error_mentions_service_for_system_socket() {
        let candidates = vec![PathBuf::from(SYSTEM_SOCKET)];
        match unreachable_error(&candidates) {
            InitError::DaemonUnreachable { socket, hint } => {
                assert_eq!(socket, SYSTEM_SOCKET);
                assert!(hint.contains("systemctl"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
