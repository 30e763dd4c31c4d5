//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (sensors, pump, event sinks, storage) implement these
//! traits. The [`AppService`](super::service::AppService) consumes them via
//! generics, so the domain core never touches hardware directly.

use crate::config::PumpConfig;
use crate::error::ActuatorError;
use crate::history::{HistoryError, HistoryRecorder};
use crate::sensors::SensorSample;

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this once per tick.
pub trait SensorPort {
    /// Take one conditioned sample. Never fails; a lost sensor shows up
    /// as `None` fields.
    fn sample(&mut self) -> SensorSample;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command the pump.
pub trait ActuatorPort {
    /// Drive the pump PWM straight to `pwm` (0–255).
    fn drive_pump(&mut self, pwm: u8) -> Result<(), ActuatorError>;

    /// Ramp the pump from 0 to `target` over `duration_ms`.
    fn ramp_pump(&mut self, target: u8, duration_ms: u32) -> Result<(), ActuatorError>;

    /// Immediately stop the pump.
    fn stop_pump(&mut self) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / audit)
// ───────────────────────────────────────────────────────────────

/// The domain emits [`AppEvent`]s through this port, stamped with the
/// millisecond clock. Adapters decide where they go (serial log, CSV).
pub trait EventSink {
    fn emit(&mut self, ts_ms: u32, event: &AppEvent);
}

/// Fan-out to two sinks.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, ts_ms: u32, event: &AppEvent) {
        self.0.emit(ts_ms, event);
        self.1.emit(ts_ms, event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, ts_ms: u32, event: &AppEvent) {
        (**self).emit(ts_ms, event);
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the pump configuration.
///
/// Implementations MUST store only validated configs; the service always
/// runs [`validate`](crate::config::validate) before calling `save`.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ConfigError::NotFound`] on first boot.
    fn load(&self) -> Result<PumpConfig, ConfigError>;

    /// Persist configuration.
    fn save(&mut self, config: &PumpConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// History port (driven adapter: domain ↔ history snapshot)
// ───────────────────────────────────────────────────────────────

pub trait HistoryPort {
    fn load_history(&self) -> Result<HistoryRecorder, HistoryError>;

    fn save_history(&mut self, history: &HistoryRecorder) -> Result<(), HistoryError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// Keys are namespaced to prevent collisions between subsystems. Write
/// operations MUST be atomic: no partial writes on power loss. The
/// ESP-IDF NVS API guarantees this natively; in-memory simulation
/// achieves it trivially.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config is not readable text.
    Corrupted,
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Value larger than the caller's buffer or the backend's limit.
    TooLarge,
    /// Namespace or key empty or longer than the backend allows.
    InvalidKey,
    /// Generic I/O error.
    IoError,
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Full => Self::StorageFull,
            StorageError::TooLarge => Self::Corrupted,
            StorageError::InvalidKey | StorageError::IoError => Self::IoError,
        }
    }
}

impl From<StorageError> for HistoryError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::TooLarge => Self::Malformed,
            StorageError::Full | StorageError::InvalidKey | StorageError::IoError => Self::Storage,
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::TooLarge => write!(f, "value too large"),
            Self::InvalidKey => write!(f, "invalid namespace or key"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
