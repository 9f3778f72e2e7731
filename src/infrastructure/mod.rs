//! Infrastructure layer - Backend adapter implementations
//!
//! Contains the concrete input-injection transports behind the
//! `InputBackend` port, plus environment probing and process supervision.

pub mod backend;

// Re-export the selection surface
pub use backend::{create_backend, BackendPreference};
