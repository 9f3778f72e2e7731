//! Backend selection and construction
//!
//! `create_backend` turns a `BackendPreference` into an established
//! transport. `Auto` probes the compiled-in strategies in priority order
//! (direct protocol, external tool, daemon socket) and reports every
//! failed probe when none succeeds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::ports::{InitError, InputBackend};

#[cfg(feature = "libei")]
use super::libei::LibeiBackend;
#[cfg(feature = "wtype")]
use super::wtype::WtypeBackend;
#[cfg(feature = "ydotool")]
use super::ydotool::YdotoolBackend;

/// Which backend `initialize` should establish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendPreference {
    /// Probe strategies in priority order and take the first that works
    #[default]
    Auto,
    /// Direct EI protocol only
    #[cfg(feature = "libei")]
    DirectProtocol,
    /// wtype only
    #[cfg(feature = "wtype")]
    ExternalTool,
    /// ydotool daemon only
    #[cfg(feature = "ydotool")]
    DaemonSocket,
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendPreference::Auto => write!(f, "auto"),
            #[cfg(feature = "libei")]
            BackendPreference::DirectProtocol => write!(f, "libei"),
            #[cfg(feature = "wtype")]
            BackendPreference::ExternalTool => write!(f, "wtype"),
            #[cfg(feature = "ydotool")]
            BackendPreference::DaemonSocket => write!(f, "ydotool"),
        }
    }
}

/// Error parsing a backend preference from text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown input backend '{value}', expected one of: auto, libei, wtype, ydotool")]
pub struct ParseBackendPreferenceError {
    pub value: String,
}

impl FromStr for BackendPreference {
    type Err = ParseBackendPreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendPreference::Auto),
            #[cfg(feature = "libei")]
            "libei" | "direct-protocol" => Ok(BackendPreference::DirectProtocol),
            #[cfg(feature = "wtype")]
            "wtype" | "external-tool" => Ok(BackendPreference::ExternalTool),
            #[cfg(feature = "ydotool")]
            "ydotool" | "daemon-socket" => Ok(BackendPreference::DaemonSocket),
            _ => Err(ParseBackendPreferenceError {
                value: s.to_string(),
            }),
        }
    }
}

/// Establish the requested backend
pub async fn create_backend(
    preference: BackendPreference,
) -> Result<Box<dyn InputBackend>, InitError> {
    match preference {
        BackendPreference::Auto => auto_select().await,
        #[cfg(feature = "libei")]
        BackendPreference::DirectProtocol => {
            Ok(Box::new(LibeiBackend::connect().await?) as Box<dyn InputBackend>)
        }
        #[cfg(feature = "wtype")]
        BackendPreference::ExternalTool => {
            Ok(Box::new(WtypeBackend::connect().await?) as Box<dyn InputBackend>)
        }
        #[cfg(feature = "ydotool")]
        BackendPreference::DaemonSocket => {
            Ok(Box::new(YdotoolBackend::connect().await?) as Box<dyn InputBackend>)
        }
    }
}

/// Probe strategies in priority order, keeping every failure for the
/// final diagnostic.
async fn auto_select() -> Result<Box<dyn InputBackend>, InitError> {
    let mut failures: Vec<String> = Vec::new();

    #[cfg(feature = "libei")]
    match LibeiBackend::connect().await {
        Ok(backend) => {
            info!("selected direct protocol backend");
            return Ok(Box::new(backend));
        }
        Err(e) => {
            warn!(error = %e, "direct protocol backend unavailable");
            failures.push(format!("libei: {e}"));
        }
    }

    #[cfg(feature = "wtype")]
    match WtypeBackend::connect().await {
        Ok(backend) => {
            info!("selected external tool backend");
            return Ok(Box::new(backend));
        }
        Err(e) => {
            warn!(error = %e, "external tool backend unavailable");
            failures.push(format!("wtype: {e}"));
        }
    }

    #[cfg(feature = "ydotool")]
    match YdotoolBackend::connect().await {
        Ok(backend) => {
            info!("selected daemon socket backend");
            return Ok(Box::new(backend));
        }
        Err(e) => {
            warn!(error = %e, "daemon socket backend unavailable");
            failures.push(format!("ydotool: {e}"));
        }
    }

    if failures.is_empty() {
        failures.push("no backend compiled in".to_string());
    }
    Err(InitError::NoBackendAvailable(failures.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preference_is_auto() {
        assert_eq!(BackendPreference::default(), BackendPreference::Auto);
    }

    #[test]
    fn preference_parses_tool_names() {
        assert_eq!(
            "auto".parse::<BackendPreference>().unwrap(),
            BackendPreference::Auto
        );
        #[cfg(feature = "libei")]
        assert_eq!(
            "libei".parse::<BackendPreference>().unwrap(),
            BackendPreference::DirectProtocol
        );
        #[cfg(feature = "wtype")]
        assert_eq!(
            "wtype".parse::<BackendPreference>().unwrap(),
            BackendPreference::ExternalTool
        );
        #[cfg(feature = "ydotool")]
        assert_eq!(
            "YDOTOOL".parse::<BackendPreference>().unwrap(),
            BackendPreference::DaemonSocket
        );
    }

    #[test]
    fn preference_parses_kind_names() {
        #[cfg(feature = "libei")]
        assert_eq!(
            "direct-protocol".parse::<BackendPreference>().unwrap(),
            BackendPreference::DirectProtocol
        );
        #[cfg(feature = "ydotool")]
        assert_eq!(
            "daemon-socket".parse::<BackendPreference>().unwrap(),
            BackendPreference::DaemonSocket
        );
    }

    #[test]
    fn unknown_preference_is_rejected() {
        let err = "teleport".parse::<BackendPreference>().unwrap_err();
        assert_eq!(err.value, "teleport");
        assert!(err.to_string().contains("teleport"));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let prefs = [
            BackendPreference::Auto,
            #[cfg(feature = "libei")]
            BackendPreference::DirectProtocol,
            #[cfg(feature = "wtype")]
            BackendPreference::ExternalTool,
            #[cfg(feature = "ydotool")]
            BackendPreference::DaemonSocket,
        ];
        for pref in prefs {
            assert_eq!(pref.to_string().parse::<BackendPreference>(), Ok(pref));
        }
    }
}
