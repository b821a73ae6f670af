//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log or MQTT).

use crate::error::LockerError;
use crate::locker::{Channel, LockerConfirmation, LockerId, Millis};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service has started with the given auto-close policy.
    Started { open_duration_ms: Millis },

    /// A locker was unlocked.
    LockerOpened(LockerConfirmation),

    /// A locker was re-locked (timer expiry or explicit close).
    LockerClosed(LockerConfirmation),

    /// An open request was refused; nothing changed.
    OpenRejected {
        locker_id: LockerId,
        channel: Channel,
        reason: LockerError,
    },
}

impl AppEvent {
    /// Locker id the event concerns, if any (drives the response topic).
    pub fn locker_id(&self) -> Option<&str> {
        match self {
            Self::LockerOpened(c) | Self::LockerClosed(c) => Some(c.locker_id.as_str()),
            Self::OpenRejected { locker_id, .. } => Some(locker_id.as_str()),
            Self::Started { .. } => None,
        }
    }
}
