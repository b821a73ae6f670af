//! Locker lifecycle core — the open-compartment registry and the
//! controller that drives each compartment Closed → Open → Closed.
//!
//! ```text
//!  open(channel, id) ──▶ ┌──────────────────────┐ ──▶ ActuatorPort (HIGH)
//!                        │  LockerController    │
//!  sweep(now)        ──▶ │   └─ LockerRegistry  │ ──▶ ActuatorPort (LOW)
//!                        └──────────────────────┘
//! ```
//!
//! Pure logic: time arrives as a `now` argument and the actuator as a
//! port, so every path runs on the host with a manual clock.

pub mod controller;
pub mod registry;

use crate::config::LOCKER_ID_MAX_LEN;

/// Actuator line number understood by the platform GPIO layer.
pub type Channel = u8;

/// Monotonic milliseconds since boot. Wraps at `u32::MAX` (~49.7 days);
/// all elapsed-time math uses `wrapping_sub`.
pub type Millis = u32;

/// Caller-supplied logical locker name.
pub type LockerId = heapless::String<LOCKER_ID_MAX_LEN>;

/// Physical state of a compartment, as reported in lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockerStatus {
    Open,
    Closed,
}

impl LockerStatus {
    /// Wire spelling used in confirmation payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Result of a successful transition, handed to the event sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockerConfirmation {
    pub locker_id: LockerId,
    pub channel: Channel,
    pub status: LockerStatus,
}

/// Build a [`LockerId`] from a string slice.
///
/// Returns `None` if `id` is longer than [`LOCKER_ID_MAX_LEN`] bytes.
pub fn locker_id(id: &str) -> Option<LockerId> {
    let mut out = LockerId::new();
    out.push_str(id).ok()?;
    Some(out)
}
