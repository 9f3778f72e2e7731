//! Input-injection backend adapters
//!
//! One adapter per transport, selected at compile time through Cargo
//! features and at run time through `BackendPreference`:
//!
//! - `libei`: direct EI event-injection protocol
//! - `wtype`: external CLI typing tool
//! - `ydotool`: privileged daemon reached over a discovered UNIX socket

mod factory;
pub mod probe;

#[cfg(any(feature = "wtype", feature = "ydotool"))]
mod process;

#[cfg(feature = "libei")]
mod libei;
#[cfg(feature = "wtype")]
mod wtype;
#[cfg(feature = "ydotool")]
mod ydotool;

pub use factory::{create_backend, BackendPreference, ParseBackendPreferenceError};

#[cfg(feature = "libei")]
pub use libei::LibeiBackend;
#[cfg(feature = "wtype")]
pub use wtype::WtypeBackend;
#[cfg(feature = "ydotool")]
pub use ydotool::YdotoolBackend;
