//! wtype external-tool backend
//!
//! Uses the Wayland-native `wtype` utility, one invocation per unit (or
//! one for the whole buffer on the zero-delay fast path).

use std::sync::atomic::AtomicU32;

use async_trait::async_trait;
use tokio::process::Command;

use crate::application::ports::{
    BackendError, BackendKind, InitError, InputBackend, UnitGranularity,
};

use super::probe;
use super::process::{kill_outstanding, run_tool};

/// PATH probe budget for the tool check
const PROBE_BUDGET_MS: u64 = 1000;

/// Backend invoking `wtype` per submission
pub struct WtypeBackend {
    typing_pid: AtomicU32,
}

impl WtypeBackend {
    /// Verify `wtype` is present and build the backend
    pub async fn connect() -> Result<Self, InitError> {
        if !probe::command_on_path("wtype", PROBE_BUDGET_MS).await {
            return Err(InitError::ToolNotFound("wtype"));
        }

        Ok(Self {
            typing_pid: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl InputBackend for WtypeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ExternalTool
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
        let mut command = Command::new("wtype");
        command.arg(text);
        run_tool(command, "wtype", &self.typing_pid).await
    }

    fn cancel_outstanding(&self) {
        kill_outstanding(&self.typing_pid);
    }
}
