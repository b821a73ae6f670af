//! JSON wire format for locker commands and confirmations.
//!
//! Inbound (`locker/commands`):
//!
//! ```json
//! {"action": "open", "locker_id": "A1", "gpio": 13}
//! ```
//!
//! Outbound (`locker/responses/<locker_id>`):
//!
//! ```json
//! {"success": true, "locker_id": "A1", "status": "open", "gpio": 13}
//! ```
//!
//! Decoding is strict: a missing or unusable field yields a
//! [`DecodeError`] and the message is dropped by the engine.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::adapters::utils::is_printable_ascii;
use crate::app::commands::AppCommand;
use crate::app::events::AppEvent;
use crate::error::LockerError;
use crate::locker::{Channel, LockerStatus, locker_id};
use crate::pins;

// ── Inbound ───────────────────────────────────────────────────

/// Why an inbound payload was not turned into a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Not a JSON object of the expected shape.
    InvalidJson,
    MissingAction,
    UnknownAction,
    MissingLockerId,
    /// Empty, too long, non-printable, or contains a topic separator.
    InvalidLockerId,
    MissingChannel,
    /// Not a usable actuator line on this board.
    InvalidChannel(i64),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson => write!(f, "payload is not a valid command object"),
            Self::MissingAction => write!(f, "missing action"),
            Self::UnknownAction => write!(f, "unknown action"),
            Self::MissingLockerId => write!(f, "missing locker_id"),
            Self::InvalidLockerId => write!(f, "invalid locker_id"),
            Self::MissingChannel => write!(f, "missing gpio"),
            Self::InvalidChannel(gpio) => write!(f, "gpio {gpio} is not an actuator line"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCommand {
    action: Option<String>,
    #[serde(alias = "lockerId")]
    locker_id: Option<String>,
    #[serde(alias = "channel")]
    gpio: Option<i64>,
}

/// Decode one MQTT payload into an [`AppCommand`].
pub fn decode_command(payload: &[u8]) -> Result<AppCommand, DecodeError> {
    let raw: RawCommand =
        serde_json::from_slice(payload).map_err(|_| DecodeError::InvalidJson)?;

    let action = raw
        .action
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or(DecodeError::MissingAction)?;

    let channel = match raw.gpio {
        None | Some(0) => return Err(DecodeError::MissingChannel),
        Some(gpio) => validate_channel(gpio)?,
    };

    if action.eq_ignore_ascii_case("open") {
        let id = raw
            .locker_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(DecodeError::MissingLockerId)?;
        if !is_valid_locker_id(id) {
            return Err(DecodeError::InvalidLockerId);
        }
        let locker_id = locker_id(id).ok_or(DecodeError::InvalidLockerId)?;
        Ok(AppCommand::OpenLocker { locker_id, channel })
    } else if action.eq_ignore_ascii_case("close") {
        Ok(AppCommand::CloseLocker { channel })
    } else {
        Err(DecodeError::UnknownAction)
    }
}

fn validate_channel(gpio: i64) -> Result<Channel, DecodeError> {
    Channel::try_from(gpio)
        .ok()
        .filter(|&ch| pins::is_actuator_gpio(ch))
        .ok_or(DecodeError::InvalidChannel(gpio))
}

/// A locker id becomes one topic level, so MQTT separators and
/// wildcards are refused along with control characters.
fn is_valid_locker_id(id: &str) -> bool {
    is_printable_ascii(id) && !id.contains(['/', '+', '#'])
}

// ── Outbound ──────────────────────────────────────────────────

/// Confirmation payload published for every lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockerResponse<'a> {
    pub success: bool,
    pub locker_id: &'a str,
    pub status: &'static str,
    pub gpio: Channel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl<'a> LockerResponse<'a> {
    /// Payload for `event`, or `None` for events that are not published.
    pub fn from_event(event: &'a AppEvent) -> Option<Self> {
        match event {
            AppEvent::LockerOpened(c) | AppEvent::LockerClosed(c) => Some(Self {
                success: true,
                locker_id: c.locker_id.as_str(),
                status: c.status.as_str(),
                gpio: c.channel,
                error: None,
            }),
            AppEvent::OpenRejected {
                locker_id,
                channel,
                reason,
            } => {
                // Report the state the channel is actually in.
                let status = match reason {
                    LockerError::DuplicateChannel(_) => LockerStatus::Open,
                    LockerError::RegistryFull | LockerError::NotOpen(_) => LockerStatus::Closed,
                };
                Some(Self {
                    success: false,
                    locker_id: locker_id.as_str(),
                    status: status.as_str(),
                    gpio: *channel,
                    error: Some(reason.reason()),
                })
            }
            AppEvent::Started { .. } => None,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Per-locker response topic: `<base>/<locker_id>`.
pub fn response_topic(base: &str, locker_id: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), locker_id)
}
