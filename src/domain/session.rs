//! Typing session entity
//!
//! One in-flight request to emit a text buffer as keystrokes. The session
//! is owned exclusively by the controller that drives it; the only piece
//! shared with other execution contexts is the cancellation flag, which is
//! monotonic for the session's lifetime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One in-flight typing request: the unit buffer, a cursor, the configured
/// delays, and the shared cancellation flag.
pub struct TypingSession {
    units: Vec<char>,
    cursor: usize,
    key_delay: Duration,
    start_delay: Duration,
    cancelled: Arc<AtomicBool>,
}

impl TypingSession {
    /// Create a session over `text` with a fresh cursor.
    ///
    /// The cancellation flag is shared; callers hand in an unset flag so a
    /// new session never observes a stale request from a previous one.
    pub fn new(
        text: &str,
        key_delay_ms: u64,
        start_delay_ms: u64,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            units: text.chars().collect(),
            cursor: 0,
            key_delay: Duration::from_millis(key_delay_ms),
            start_delay: Duration::from_millis(start_delay_ms),
            cancelled,
        }
    }

    /// Total number of units in the buffer
    pub fn total(&self) -> usize {
        self.units.len()
    }

    /// Number of units already completed
    pub fn completed(&self) -> usize {
        self.cursor
    }

    /// The unit at the cursor, or `None` when the buffer is exhausted
    pub fn current(&self) -> Option<char> {
        self.units.get(self.cursor).copied()
    }

    /// The not-yet-emitted tail of the buffer, for one-shot submission
    pub fn remaining(&self) -> String {
        self.units[self.cursor..].iter().collect()
    }

    /// Advance past the current unit and return `(completed, total)`
    pub fn advance(&mut self) -> (usize, usize) {
        debug_assert!(self.cursor < self.units.len());
        self.cursor += 1;
        (self.cursor, self.units.len())
    }

    /// Mark the whole remaining buffer as completed (one-shot fast path)
    pub fn complete_all(&mut self) -> (usize, usize) {
        self.cursor = self.units.len();
        (self.cursor, self.units.len())
    }

    /// Whether every unit has been processed
    pub fn is_done(&self) -> bool {
        self.cursor >= self.units.len()
    }

    /// Whether the unit at the cursor is the last one
    pub fn is_last(&self) -> bool {
        self.cursor + 1 >= self.units.len()
    }

    /// Whether cancellation has been requested from any context
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Configured delay between units
    pub fn key_delay(&self) -> Duration {
        self.key_delay
    }

    /// Configured delay before the first unit
    pub fn start_delay(&self) -> Duration {
        self.start_delay
    }
}
