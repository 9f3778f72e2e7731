//! Bounded environment probes
//!
//! Every potentially blocking check here runs under an explicit budget,
//! expressed once as poll-with-timeout primitives instead of ad hoc
//! sleep loops at each call site.

#[cfg(any(feature = "wtype", feature = "ydotool"))]
use std::process::Stdio;
#[cfg(any(feature = "wtype", feature = "ydotool"))]
use std::time::Duration;

/// Check whether `tool` resolves on the search path, within `budget_ms`.
#[cfg(any(feature = "wtype", feature = "ydotool"))]
pub async fn command_on_path(tool: &str, budget_ms: u64) -> bool {
    let check = async {
        tokio::process::Command::new("which")
            .arg(tool)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    };

    tokio::time::timeout(Duration::from_millis(budget_ms), check)
        .await
        .unwrap_or(false)
}

/// Poll for `path` to exist, at `interval_ms`, giving up after `total_ms`.
#[cfg(feature = "ydotool")]
pub async fn wait_for_path(path: &std::path::Path, total_ms: u64, interval_ms: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(total_ms);
    loop {
        if path.exists() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
    }
}
