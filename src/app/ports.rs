//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (GPIO, clock, event sinks, storage) implement these
//! traits.  The [`AppService`](super::service::AppService) consumes them via
//! generics, so the locker core never touches hardware directly.
//!
//! ## Security notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **StoragePort** keeps WiFi credentials in their own namespace.

use crate::config::SystemConfig;
use crate::locker::{Channel, Millis};

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: platform timer → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.
pub trait ClockPort {
    /// Milliseconds since boot, wrapping at `u32::MAX`.
    fn now_ms(&self) -> Millis;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: drives the lock solenoid / relay lines.
///
/// Writes are fire-and-forget; a faulty line is not reported back.
pub trait ActuatorPort {
    /// Drive the line HIGH (unlock).
    fn assert_channel(&mut self, channel: Channel);

    /// Drive the line LOW (lock).
    fn deassert_channel(&mut self, channel: Channel);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → messaging / logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, MQTT).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Fan an event out to two sinks, first `.0` then `.1`.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// # Security
///
/// Implementations MUST validate config values before persisting.
/// Invalid values are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped, so a bad portal submission cannot leave the
/// device pointing at an unusable broker.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for NVS, credentials, etc.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic; no partial writes on power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
