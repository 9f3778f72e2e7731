//! Domain layer - Core typing logic
//!
//! Contains the character-to-keycode translation table and the
//! typing-session entity. This layer has no dependencies on external
//! systems.

pub mod keymap;
pub mod session;

// Re-export common types
pub use keymap::{map_char, KeyMapping, KEY_LEFTSHIFT};
pub use session::TypingSession;
