//! Unified error types for the locker firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the top-level loop's error handling uniform. All variants are `Copy`
//! so they travel through events and logs without allocation.

use core::fmt;

use crate::locker::Channel;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A locker lifecycle request was rejected.
    Locker(LockerError),
    /// A communication subsystem failed.
    Comms(CommsError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locker(e) => write!(f, "locker: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Locker lifecycle errors
// ---------------------------------------------------------------------------

/// Rejections from the locker registry and lifecycle controller.
///
/// None of these is fatal: the request is refused and every existing
/// entry keeps its timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockerError {
    /// The channel already has an open entry.
    DuplicateChannel(Channel),
    /// Every registry slot is in use.
    RegistryFull,
    /// An explicit close named a channel that is not open.
    NotOpen(Channel),
}

impl LockerError {
    /// Short machine-readable reason, used in rejection payloads.
    pub const fn reason(self) -> &'static str {
        match self {
            Self::DuplicateChannel(_) => "already_open",
            Self::RegistryFull => "registry_full",
            Self::NotOpen(_) => "not_open",
        }
    }
}

impl fmt::Display for LockerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateChannel(ch) => write!(f, "channel {ch} is already open"),
            Self::RegistryFull => write!(f, "open-locker registry is full"),
            Self::NotOpen(ch) => write!(f, "channel {ch} is not open"),
        }
    }
}

impl From<LockerError> for Error {
    fn from(e: LockerError) -> Self {
        Self::Locker(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    MqttConnectFailed,
    MqttSubscribeFailed,
    MqttPublishFailed,
    MqttDisconnected,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MqttConnectFailed => write!(f, "MQTT connect failed"),
            Self::MqttSubscribeFailed => write!(f, "MQTT subscribe failed"),
            Self::MqttPublishFailed => write!(f, "MQTT publish failed"),
            Self::MqttDisconnected => write!(f, "MQTT not connected"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locker_error_converts_and_displays() {
        let e: Error = LockerError::DuplicateChannel(13).into();
        assert_eq!(e, Error::Locker(LockerError::DuplicateChannel(13)));
        assert_eq!(e.to_string(), "locker: channel 13 is already open");

        let e: Error = CommsError::MqttDisconnected.into();
        assert_eq!(e.to_string(), "comms: MQTT not connected");
    }

    #[test]
    fn reasons_are_stable() {
        assert_eq!(LockerError::DuplicateChannel(1).reason(), "already_open");
        assert_eq!(LockerError::RegistryFull.reason(), "registry_full");
        assert_eq!(LockerError::NotOpen(4).reason(), "not_open");
    }
}
