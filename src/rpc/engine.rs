//! Command engine: routes inbound MQTT messages to the [`AppService`].
//!
//! **Transport-decoupled**: the engine does not own the MQTT client.
//! The main loop drains [`INBOUND_CHANNEL`](super::channels::INBOUND_CHANNEL)
//! and feeds each `(topic, payload)` pair to [`CommandEngine::dispatch`].
//! Confirmations leave through the [`EventSink`] the caller passes in.
//!
//! Every message passes two gates:
//!
//! 1. **Topic**: anything outside the command topic is ignored.
//! 2. **Decode**: malformed payloads are dropped with a warning and no
//!    reply, since there may be no usable `locker_id` to answer on.

use log::{debug, warn};

use crate::app::ports::{ActuatorPort, ClockPort, EventSink};
use crate::app::service::AppService;
use crate::error::Error;

use super::codec::{DecodeError, decode_command};

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Command applied; a confirmation was emitted.
    Applied,
    /// Command decoded but refused by the locker core.
    Refused(Error),
    /// Payload could not be decoded; nothing was emitted.
    Malformed(DecodeError),
    /// Message arrived on a topic the engine does not serve.
    IgnoredTopic,
}

/// Counters since boot, surfaced in the periodic status log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub applied: u32,
    pub refused: u32,
    pub malformed: u32,
}

pub struct CommandEngine {
    command_topic: String,
    stats: EngineStats,
}

impl CommandEngine {
    pub fn new(command_topic: &str) -> Self {
        Self {
            command_topic: command_topic.into(),
            stats: EngineStats::default(),
        }
    }

    pub fn command_topic(&self) -> &str {
        &self.command_topic
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Decode and apply one message.
    pub fn dispatch(
        &mut self,
        topic: &str,
        payload: &[u8],
        app: &mut AppService,
        clock: &impl ClockPort,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> DispatchOutcome {
        if topic != self.command_topic {
            debug!("MQTT: ignoring message on '{}'", topic);
            return DispatchOutcome::IgnoredTopic;
        }

        let cmd = match decode_command(payload) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("MQTT: dropped command ({} bytes): {}", payload.len(), e);
                self.stats.malformed = self.stats.malformed.wrapping_add(1);
                return DispatchOutcome::Malformed(e);
            }
        };

        debug!("MQTT: {:?}", cmd);
        match app.handle_command(cmd, clock, hw, sink) {
            Ok(()) => {
                self.stats.applied = self.stats.applied.wrapping_add(1);
                DispatchOutcome::Applied
            }
            Err(e) => {
                self.stats.refused = self.stats.refused.wrapping_add(1);
                DispatchOutcome::Refused(e)
            }
        }
    }
}
