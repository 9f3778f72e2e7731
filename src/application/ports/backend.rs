//! Input backend port interface

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The transport an established backend speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// Direct EI event-injection protocol (libei)
    DirectProtocol,
    /// External CLI typing tool (wtype)
    ExternalTool,
    /// Privileged daemon reached over a UNIX socket (ydotoold)
    DaemonSocket,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::DirectProtocol => write!(f, "direct protocol"),
            BackendKind::ExternalTool => write!(f, "external tool"),
            BackendKind::DaemonSocket => write!(f, "daemon socket"),
        }
    }
}

/// The delivery granularity a backend natively supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitGranularity {
    /// Individual press/release key events; the controller feeds one
    /// character per unit
    KeyEvents,
    /// Opaque "type this string" submissions; the controller may coalesce
    /// the whole buffer into one call when no inter-key delay is configured
    Text,
}

/// Errors establishing a backend.
///
/// All variants are terminal for that `initialize()` call but retryable:
/// a later call re-runs the same probing sequence.
#[derive(Debug, Clone, Error)]
pub enum InitError {
    #[error("No seat offered by the input server")]
    NoSeat,

    #[error("No keyboard device offered by the input server")]
    NoKeyboardDevice,

    #[error("Timed out waiting for the input server connection")]
    ConnectTimeout,

    #[error("Disconnected from the input server: {0}")]
    Disconnected(String),

    #[error("{0} not found on PATH. Please install it.")]
    ToolNotFound(&'static str),

    #[error("Cannot reach the input daemon at {socket}. {hint}")]
    DaemonUnreachable { socket: String, hint: String },

    #[error("No usable input backend: {0}")]
    NoBackendAvailable(String),
}

/// Transport errors raised mid-session
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("{tool} exited with {status}")]
    CommandFailed {
        tool: &'static str,
        status: String,
        stderr: String,
    },

    #[error("Failed to spawn {tool}: {reason}")]
    SpawnFailed { tool: &'static str, reason: String },

    #[error("Timed out waiting for {tool} to finish")]
    Timeout { tool: &'static str },

    #[error("Disconnected from input server: {0}")]
    Disconnected(String),

    #[error("Input protocol error: {0}")]
    Protocol(String),
}

impl BackendError {
    /// Whether the backend itself is gone and the engine needs
    /// re-initialization rather than just aborting the session
    pub fn is_fatal(&self) -> bool {
        matches!(self, BackendError::Disconnected(_))
    }
}

/// Port for an established input-injection transport.
///
/// Exactly one implementation is held per engine instance; it is created
/// during `initialize()` and torn down on shutdown or fatal error.
#[async_trait]
pub trait InputBackend: Send + Sync {
    /// The transport this backend speaks
    fn kind(&self) -> BackendKind;

    /// The delivery granularity the controller should drive it at
    fn granularity(&self) -> UnitGranularity;

    /// Emit one character.
    ///
    /// Returns `Ok(false)` when the character has no mapping on this
    /// transport and was skipped; the session still counts it as a
    /// completed unit.
    async fn send_char(&self, ch: char) -> Result<bool, BackendError>;

    /// Submit a whole string in one call
    async fn send_text(&self, text: &str) -> Result<(), BackendError>;

    /// Best-effort termination of any in-flight delivery.
    ///
    /// Called from outside the session's execution context on
    /// cancellation; must not block.
    fn cancel_outstanding(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_display() {
        assert_eq!(BackendKind::DirectProtocol.to_string(), "direct protocol");
        assert_eq!(BackendKind::ExternalTool.to_string(), "external tool");
        assert_eq!(BackendKind::DaemonSocket.to_string(), "daemon socket");
    }

    #[test]
    fn command_failed_names_the_tool_and_status() {
        let err = BackendError::CommandFailed {
            tool: "ydotool",
            status: "exit status: 1".to_string(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "ydotool exited with exit status: 1");
    }

    #[test]
    fn only_disconnect_is_fatal() {
        assert!(BackendError::Disconnected("gone".into()).is_fatal());
        assert!(!BackendError::Timeout { tool: "wtype" }.is_fatal());
        assert!(!BackendError::Protocol("bad frame".into()).is_fatal());
    }
}
