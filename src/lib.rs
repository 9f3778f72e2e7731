//! GhostType - synthetic keyboard input engine for Wayland
//!
//! This crate replays a Unicode text buffer as synthetic keystrokes into
//! whatever window currently has focus, on desktops where no single input
//! injection API is uniformly available. It probes the environment for a
//! working backend (direct EI protocol, the `wtype` tool, or the `ydotoold`
//! daemon), then drives an interruptible typing session with progress and
//! cancellation reporting.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Pure logic - the character-to-keycode table and the
//!   typing-session entity
//! - **Application**: The `InputEngine` use case and the `InputBackend` port
//! - **Infrastructure**: Backend adapters (libei, wtype, ydotool), probing,
//!   and process supervision
//!
//! # Example
//!
//! ```no_run
//! use ghosttype::{InputEngine, TypingCallbacks, TypingOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = InputEngine::new();
//! engine.initialize().await?;
//!
//! let callbacks = TypingCallbacks {
//!     on_progress: Some(Box::new(|current, total| {
//!         eprintln!("{current}/{total}");
//!     })),
//!     ..Default::default()
//! };
//! engine
//!     .type_text("Hello, world!", TypingOptions::default(), &callbacks)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the public engine surface
pub use application::engine::{
    InitError, InputEngine, TypeTextError, TypingCallbacks, TypingOptions, TypingOutcome,
};
pub use application::ports::{BackendError, BackendKind, InputBackend, UnitGranularity};
pub use infrastructure::backend::BackendPreference;
