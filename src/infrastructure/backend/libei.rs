//! Direct EI protocol backend
//!
//! Speaks the emulated-input (EI) protocol straight to the compositor's
//! EIS socket as a sender context. Characters become evdev press/release
//! pairs, one coalesced frame per character, so this is the only backend
//! with per-key-event granularity.

use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reis::ei::{self, handshake::ContextType, keyboard::KeyState};
use reis::event::{DeviceCapability, EiEvent};
use tracing::{debug, info, trace};

use crate::application::ports::{
    BackendError, BackendKind, InitError, InputBackend, UnitGranularity,
};
use crate::domain::keymap::{map_char, KeyMapping, KEY_LEFTSHIFT};

/// Total budget for socket connect, handshake, and device discovery
const CONNECT_TIMEOUT_MS: u64 = 5000;

/// EAGAIN; the only flush error worth retrying
const ERRNO_WOULD_BLOCK: i32 = 11;
const FLUSH_MAX_RETRIES: u32 = 50;
const FLUSH_MAX_DELAY_MS: u64 = 100;

/// Backend injecting key events over an established EI connection
#[derive(Debug)]
pub struct LibeiBackend {
    inner: Mutex<EiConnection>,
}

/// Live EI session state, serialized behind the backend's mutex
#[derive(Debug)]
struct EiConnection {
    connection: reis::event::Connection,
    device: reis::event::Device,
    keyboard: ei::Keyboard,
    sequence: u32,
    started: Instant,
}

impl LibeiBackend {
    /// Connect to the compositor's EIS socket and wait for a keyboard
    /// device, bounded by the connect timeout.
    pub async fn connect() -> Result<Self, InitError> {
        let path = socket_path()?;
        info!(socket = %path.display(), "connecting to EIS socket");

        let handshake = tokio::task::spawn_blocking(move || connect_blocking(&path));
        let inner = match tokio::time::timeout(
            Duration::from_millis(CONNECT_TIMEOUT_MS),
            handshake,
        )
        .await
        {
            Err(_) => return Err(InitError::ConnectTimeout),
            Ok(Err(join_err)) => return Err(InitError::Disconnected(join_err.to_string())),
            Ok(Ok(result)) => result?,
        };

        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EiConnection> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl InputBackend for LibeiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DirectProtocol
    }

    fn granularity(&self) -> UnitGranularity {
        UnitGranularity::KeyEvents
    }

    async fn send_char(&self, ch: char) -> Result<bool, BackendError> {
        let Some(mapping) = map_char(ch) else {
            debug!(?ch, "no keycode mapping, skipping");
            return Ok(false);
        };
        self.lock().emit(mapping)?;
        Ok(true)
    }

    async fn send_text(&self, text: &str) -> Result<(), BackendError> {
        let mut inner = self.lock();
        for ch in text.chars() {
            match map_char(ch) {
                Some(mapping) => inner.emit(mapping)?,
                None => debug!(?ch, "no keycode mapping, skipping"),
            }
        }
        Ok(())
    }

    // Events are written synchronously per character; there is no
    // outstanding delivery to tear down
    fn cancel_outstanding(&self) {}
}

impl EiConnection {
    /// Emit one mapped character as a single coalesced frame
    fn emit(&mut self, mapping: KeyMapping) -> Result<(), BackendError> {
        trace!(keycode = mapping.keycode, shift = mapping.shift, "emitting key");
        if mapping.shift {
            self.keyboard.key(KEY_LEFTSHIFT, KeyState::Press);
        }
        self.keyboard.key(mapping.keycode, KeyState::Press);
        self.keyboard.key(mapping.keycode, KeyState::Released);
        if mapping.shift {
            self.keyboard.key(KEY_LEFTSHIFT, KeyState::Released);
        }
        self.frame()
    }

    fn frame(&mut self) -> Result<(), BackendError> {
        let serial = self.connection.serial();
        let timestamp = self.started.elapsed().as_micros() as u64;
        self.device.device().frame(serial, timestamp);
        self.flush()
    }

    /// Flush with bounded backoff on a full socket buffer; any other
    /// error means the server side is gone.
    fn flush(&self) -> Result<(), BackendError> {
        let mut retries = 0;
        let mut delay_ms = 1;

        loop {
            match self.connection.flush() {
                Ok(()) => return Ok(()),
                Err(e) if e.raw_os_error() == ERRNO_WOULD_BLOCK => {
                    retries += 1;
                    if retries > FLUSH_MAX_RETRIES {
                        return Err(BackendError::Protocol(format!(
                            "socket buffer still full after {FLUSH_MAX_RETRIES} retries: {e}"
                        )));
                    }
                    trace!(delay_ms, retries, "socket buffer full, backing off");
                    std::thread::sleep(Duration::from_millis(delay_ms));
                    delay_ms = (delay_ms * 2).min(FLUSH_MAX_DELAY_MS);
                }
                Err(e) => return Err(BackendError::Disconnected(e.to_string())),
            }
        }
    }
}

impl Drop for EiConnection {
    fn drop(&mut self) {
        let serial = self.connection.serial();
        self.device.device().stop_emulating(serial);
        self.connection.connection().disconnect();
        let _ = self.connection.flush();
    }
}

/// Resolve the EIS socket path: `$LIBEI_SOCKET` (default `eis-0`),
/// joined to the runtime directory when relative.
fn socket_path() -> Result<PathBuf, InitError> {
    let name = std::env::var("LIBEI_SOCKET").unwrap_or_else(|_| "eis-0".to_string());
    let path = PathBuf::from(&name);
    if path.is_absolute() {
        return Ok(path);
    }

    let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")
        .ok_or_else(|| InitError::Disconnected("XDG_RUNTIME_DIR is not set".to_string()))?;
    Ok(PathBuf::from(runtime_dir).join(name))
}

/// Synchronous connect, handshake, and device discovery; runs on the
/// blocking pool under the caller's timeout.
fn connect_blocking(path: &std::path::Path) -> Result<EiConnection, InitError> {
    let stream = UnixStream::connect(path)
        .map_err(|e| InitError::Disconnected(format!("cannot connect to {}: {e}", path.display())))?;
    stream
        .set_nonblocking(true)
        .map_err(|e| InitError::Disconnected(e.to_string()))?;

    let context =
        ei::Context::new(stream).map_err(|e| InitError::Disconnected(e.to_string()))?;
    let (connection, mut event_iter) = context
        .handshake_blocking("ghosttype", ContextType::Sender)
        .map_err(|e| InitError::Disconnected(format!("handshake failed: {e}")))?;

    let mut saw_seat = false;
    let mut found: Option<(reis::event::Device, ei::Keyboard)> = None;

    for event_result in &mut event_iter {
        let event = event_result.map_err(|e| InitError::Disconnected(e.to_string()))?;

        match event {
            EiEvent::Disconnected(disconnected) => {
                return Err(InitError::Disconnected(format!(
                    "{:?}: {}",
                    disconnected.reason, disconnected.explanation
                )));
            }
            EiEvent::SeatAdded(seat_added) => {
                debug!(seat = ?seat_added.seat.name(), "seat offered");
                saw_seat = true;
                seat_added
                    .seat
                    .bind_capabilities(&[DeviceCapability::Keyboard]);
                connection
                    .flush()
                    .map_err(|e| InitError::Disconnected(e.to_string()))?;
            }
            EiEvent::DeviceAdded(device_added) => {
                debug!(device = ?device_added.device.name(), "device offered");
            }
            EiEvent::DeviceResumed(device_resumed) => {
                let device = device_resumed.device.clone();
                if let Some(keyboard) = device.interface::<ei::Keyboard>() {
                    info!(device = ?device.name(), "keyboard device resumed");
                    found = Some((device, keyboard));
                    break;
                }
            }
            other => trace!(?other, "event during discovery"),
        }
    }

    // Stream ended without a usable keyboard; report how far we got
    let (device, keyboard) = match found {
        Some(pair) => pair,
        None if saw_seat => return Err(InitError::NoKeyboardDevice),
        None => return Err(InitError::NoSeat),
    };

    let mut inner = EiConnection {
        connection,
        device,
        keyboard,
        sequence: 1,
        started: Instant::now(),
    };

    // Emulation spans the whole backend lifetime; stopped in Drop
    let serial = inner.connection.serial();
    inner.device.device().start_emulating(serial, inner.sequence);
    inner.sequence += 1;
    inner.flush().map_err(|e| InitError::Disconnected(e.to_string()))?;

    Ok(inner)
}
