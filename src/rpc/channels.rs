//! Inter-task channel between the MQTT client and the main loop.
//!
//! The ESP-IDF MQTT client delivers messages on its own task. The
//! callback copies each one into a bounded `embassy-sync` channel and
//! the synchronous main loop drains it, so the locker core is only ever
//! touched from one task.
//!
//! ```text
//! ┌──────────────┐ InboundMessage ┌──────────────┐
//! │ MQTT task    │───────────────▶│  Main loop   │
//! │ (callback)   │                │  (sync)      │
//! └──────────────┘                └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::{String, Vec};
use log::warn;

/// Longest topic the loop accepts.
pub const TOPIC_MAX_LEN: usize = 64;

/// Largest command payload the loop accepts.
pub const PAYLOAD_MAX_LEN: usize = 512;

/// Channel depth for inbound messages.
const INBOUND_DEPTH: usize = 8;

/// One message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String<TOPIC_MAX_LEN>,
    pub payload: Vec<u8, PAYLOAD_MAX_LEN>,
}

impl InboundMessage {
    /// Copy a message out of client-owned buffers. `None` if it does
    /// not fit.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut t = String::new();
        t.push_str(topic).ok()?;
        let p = Vec::from_slice(payload).ok()?;
        Some(Self { topic: t, payload: p })
    }
}

/// Inbound channel: MQTT task → main loop.
pub static INBOUND_CHANNEL: Channel<CriticalSectionRawMutex, InboundMessage, INBOUND_DEPTH> =
    Channel::new();

/// Queue a message for the main loop. Oversized messages and messages
/// arriving while the queue is full are dropped; returns whether it
/// was queued.
pub fn enqueue_inbound(topic: &str, payload: &[u8]) -> bool {
    let Some(msg) = InboundMessage::new(topic, payload) else {
        warn!(
            "MQTT: dropping oversized message on '{}' ({} bytes)",
            topic,
            payload.len()
        );
        return false;
    };
    if INBOUND_CHANNEL.try_send(msg).is_err() {
        warn!("MQTT: inbound queue full, message dropped");
        return false;
    }
    true
}

/// Take the next queued message, if any.
pub fn try_take_inbound() -> Option<InboundMessage> {
    INBOUND_CHANNEL.try_receive().ok()
}
