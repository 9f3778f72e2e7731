//! Application layer - The engine use case and port interfaces
//!
//! Contains the typing-session controller and the trait definition for
//! input-injection backends.

pub mod engine;
pub mod ports;

// Re-export the engine surface
pub use engine::{
    InitError, InputEngine, TypeTextError, TypingCallbacks, TypingOptions, TypingOutcome,
};
