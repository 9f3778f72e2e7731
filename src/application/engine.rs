//! Input emulation engine use case
//!
//! `InputEngine` owns one established backend and drives one typing
//! session at a time: an interruptible loop that emits one unit per
//! iteration, applies the configured delays, and reports lifecycle events
//! through caller-supplied callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::session::TypingSession;
use crate::infrastructure::backend::{create_backend, BackendPreference};

use super::ports::{BackendError, BackendKind, InputBackend, UnitGranularity};

pub use super::ports::InitError;

/// Errors from a `type_text` call
#[derive(Debug, Error)]
pub enum TypeTextError {
    #[error("No text to type")]
    NoText,

    #[error("Input engine not initialized")]
    NotInitialized,

    #[error("A typing session is already running")]
    AlreadyTyping,

    #[error("{message}")]
    Backend {
        message: String,
        #[source]
        source: BackendError,
    },
}

/// How a completed session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingOutcome {
    /// Every unit was processed
    Finished,
    /// Cancellation was observed at a check point
    Cancelled,
}

/// Per-call typing configuration.
///
/// The engine reaches into no ambient settings store; hosts read their own
/// configuration and pass it here on every call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TypingOptions {
    /// Delay between units in milliseconds
    pub key_delay_ms: u64,
    /// Delay before the first unit in milliseconds
    pub start_delay_ms: u64,
}

impl Default for TypingOptions {
    fn default() -> Self {
        Self {
            key_delay_ms: 15,
            start_delay_ms: 0,
        }
    }
}

/// Lifecycle notifications for one typing session
#[derive(Default)]
pub struct TypingCallbacks {
    /// Called once after the start delay, before the first unit
    pub on_started: Option<Box<dyn Fn() + Send + Sync>>,
    /// Called after every unit with (completed, total)
    pub on_progress: Option<Box<dyn Fn(usize, usize) + Send + Sync>>,
    /// Called when the whole buffer was processed
    pub on_finished: Option<Box<dyn Fn() + Send + Sync>>,
    /// Called when the session exits through cancellation
    pub on_cancelled: Option<Box<dyn Fn() + Send + Sync>>,
    /// Called with a human-readable message on any error
    pub on_error: Option<Box<dyn Fn(&str) + Send + Sync>>,
}

impl TypingCallbacks {
    fn started(&self) {
        if let Some(ref cb) = self.on_started {
            cb();
        }
    }

    fn progress(&self, current: usize, total: usize) {
        if let Some(ref cb) = self.on_progress {
            cb(current, total);
        }
    }

    fn finished(&self) {
        if let Some(ref cb) = self.on_finished {
            cb();
        }
    }

    fn cancelled(&self) {
        if let Some(ref cb) = self.on_cancelled {
            cb();
        }
    }

    fn error(&self, message: &str) {
        if let Some(ref cb) = self.on_error {
            cb(message);
        }
    }
}

/// The input emulation engine.
///
/// Holds at most one established backend and runs at most one typing
/// session at a time. `type_text` executes on the caller's task; callers
/// that need a responsive UI offload it themselves (`tokio::spawn`) and
/// use `cancel()` from any other context.
pub struct InputEngine {
    preference: BackendPreference,
    backend: Mutex<Option<Arc<dyn InputBackend>>>,
    typing: AtomicBool,
    cancelled: Arc<AtomicBool>,
}

impl InputEngine {
    /// Create an engine that auto-selects a backend on `initialize`
    pub fn new() -> Self {
        Self::with_preference(BackendPreference::Auto)
    }

    /// Create an engine with an explicit backend preference
    pub fn with_preference(preference: BackendPreference) -> Self {
        Self {
            preference,
            backend: Mutex::new(None),
            typing: AtomicBool::new(false),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create an engine around an already-established backend.
    ///
    /// For embedders with their own transport, and for tests.
    pub fn with_backend(backend: Arc<dyn InputBackend>) -> Self {
        let engine = Self::with_preference(BackendPreference::Auto);
        *engine.backend_slot() = Some(backend);
        engine
    }

    /// Establish a backend, probing strategies in priority order.
    ///
    /// Idempotent: a second call while initialized returns `Ok` without
    /// re-probing. After a failure (or a fatal transport error tore the
    /// engine down) the call re-runs the same probing sequence.
    pub async fn initialize(&self) -> Result<(), InitError> {
        if self.is_initialized() {
            return Ok(());
        }

        let backend = create_backend(self.preference).await?;
        info!(backend = %backend.kind(), "input backend established");
        *self.backend_slot() = Some(Arc::from(backend));
        Ok(())
    }

    /// Whether a backend is currently established
    pub fn is_initialized(&self) -> bool {
        self.backend_slot().is_some()
    }

    /// Whether a typing session is currently running
    pub fn is_typing(&self) -> bool {
        self.typing.load(Ordering::SeqCst)
    }

    /// Request cancellation of the running session.
    ///
    /// Non-blocking; sets the session's cancellation flag and best-effort
    /// kills any outstanding child process. The session reports
    /// `cancelled` asynchronously once it observes the flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(backend) = self.backend_handle() {
            backend.cancel_outstanding();
        }
    }

    /// Tear down the backend, returning the engine to the uninitialized
    /// state so `initialize` probes again.
    pub fn reset(&self) {
        *self.backend_slot() = None;
    }

    /// Emit `text` as synthetic input, driving the session to a terminal
    /// state and firing the lifecycle callbacks along the way.
    pub async fn type_text(
        &self,
        text: &str,
        options: TypingOptions,
        callbacks: &TypingCallbacks,
    ) -> Result<TypingOutcome, TypeTextError> {
        if self.typing.swap(true, Ordering::SeqCst) {
            let err = TypeTextError::AlreadyTyping;
            callbacks.error(&err.to_string());
            return Err(err);
        }

        let result = self.run_session(text, options, callbacks).await;
        self.typing.store(false, Ordering::SeqCst);
        result
    }

    async fn run_session(
        &self,
        text: &str,
        options: TypingOptions,
        callbacks: &TypingCallbacks,
    ) -> Result<TypingOutcome, TypeTextError> {
        if text.is_empty() {
            let err = TypeTextError::NoText;
            callbacks.error(&err.to_string());
            return Err(err);
        }

        let backend = match self.backend_handle() {
            Some(backend) => backend,
            None => {
                let err = TypeTextError::NotInitialized;
                callbacks.error(&err.to_string());
                return Err(err);
            }
        };

        // Fresh, unset flag for the new session
        self.cancelled.store(false, Ordering::SeqCst);
        let mut session = TypingSession::new(
            text,
            options.key_delay_ms,
            options.start_delay_ms,
            Arc::clone(&self.cancelled),
        );

        if !session.start_delay().is_zero() {
            tokio::time::sleep(session.start_delay()).await;
        }
        if session.is_cancelled() {
            callbacks.cancelled();
            return Ok(TypingOutcome::Cancelled);
        }

        callbacks.started();
        debug!(
            total = session.total(),
            backend = %backend.kind(),
            key_delay_ms = options.key_delay_ms,
            "typing session started"
        );

        // Fast path: string backends take the whole remaining buffer in
        // one submission when no inter-key delay is configured
        if backend.granularity() == UnitGranularity::Text && options.key_delay_ms == 0 {
            return self.run_one_shot(&mut session, backend, callbacks).await;
        }

        while let Some(ch) = session.current() {
            if session.is_cancelled() {
                callbacks.cancelled();
                return Ok(TypingOutcome::Cancelled);
            }

            let delivered = match backend.granularity() {
                UnitGranularity::KeyEvents => backend.send_char(ch).await,
                UnitGranularity::Text => {
                    let mut buf = [0u8; 4];
                    backend.send_text(ch.encode_utf8(&mut buf)).await.map(|_| true)
                }
            };

            match delivered {
                Ok(true) => {}
                Ok(false) => debug!(?ch, "no mapping for character, skipped"),
                Err(e) => {
                    // A forcibly killed child after cancel() is not an error
                    if session.is_cancelled() {
                        debug!(error = %e, "delivery aborted by cancellation");
                        callbacks.cancelled();
                        return Ok(TypingOutcome::Cancelled);
                    }
                    return Err(self.fail_session(backend.kind(), e, callbacks));
                }
            }

            let (current, total) = session.advance();
            callbacks.progress(current, total);

            if !session.is_done() && !session.key_delay().is_zero() {
                tokio::time::sleep(session.key_delay()).await;
            }
        }

        if session.is_cancelled() {
            callbacks.cancelled();
            Ok(TypingOutcome::Cancelled)
        } else {
            callbacks.finished();
            Ok(TypingOutcome::Finished)
        }
    }

    async fn run_one_shot(
        &self,
        session: &mut TypingSession,
        backend: Arc<dyn InputBackend>,
        callbacks: &TypingCallbacks,
    ) -> Result<TypingOutcome, TypeTextError> {
        if let Err(e) = backend.send_text(&session.remaining()).await {
            if session.is_cancelled() {
                debug!(error = %e, "one-shot delivery aborted by cancellation");
                callbacks.cancelled();
                return Ok(TypingOutcome::Cancelled);
            }
            return Err(self.fail_session(backend.kind(), e, callbacks));
        }
        if session.is_cancelled() {
            callbacks.cancelled();
            return Ok(TypingOutcome::Cancelled);
        }

        // One progress event covering the whole buffer, so progress still
        // reaches total == total on this path
        let (current, total) = session.complete_all();
        callbacks.progress(current, total);
        callbacks.finished();
        Ok(TypingOutcome::Finished)
    }

    fn fail_session(
        &self,
        kind: BackendKind,
        err: BackendError,
        callbacks: &TypingCallbacks,
    ) -> TypeTextError {
        let message = describe_backend_error(kind, &err);
        callbacks.error(&message);

        if err.is_fatal() {
            warn!(backend = %kind, "backend disconnected; engine needs re-initialization");
            self.reset();
        }

        TypeTextError::Backend {
            message,
            source: err,
        }
    }

    fn backend_handle(&self) -> Option<Arc<dyn InputBackend>> {
        self.backend_slot().clone()
    }

    fn backend_slot(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn InputBackend>>> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InputEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the user-facing message for a mid-session transport error: the
/// transport's own diagnostic when it carries one, otherwise a fixed
/// remediation line for the backend kind.
fn describe_backend_error(kind: BackendKind, err: &BackendError) -> String {
    if let BackendError::CommandFailed { stderr, .. } = err {
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
    }

    match (err, kind) {
        (
            BackendError::CommandFailed { .. }
            | BackendError::SpawnFailed { .. }
            | BackendError::Timeout { .. },
            BackendKind::DaemonSocket,
        ) => format!("{err}. Is the ydotoold daemon running?"),
        (
            BackendError::CommandFailed { .. }
            | BackendError::SpawnFailed { .. }
            | BackendError::Timeout { .. },
            BackendKind::ExternalTool,
        ) => format!("{err}. Is wtype installed and supported by your compositor?"),
        _ => err.to_string(),
    }
}
