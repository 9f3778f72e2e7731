//! Port interfaces (traits) for external systems
//!
//! These traits define the boundary between the typing-session controller
//! and the OS-level injection transports.

pub mod backend;

// Re-export common types
pub use backend::{BackendError, BackendKind, InitError, InputBackend, UnitGranularity};
