//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each lifecycle event as one
//! structured line to the ESP-IDF logger (UART console in production).
//! The MQTT adapter implements the same trait; `main` fans events out to
//! both.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::LockerOpened(c) => {
                info!("OPEN | locker={} gpio={}", c.locker_id, c.channel);
            }
            AppEvent::LockerClosed(c) => {
                info!("CLOSE | locker={} gpio={}", c.locker_id, c.channel);
            }
            AppEvent::OpenRejected {
                locker_id,
                channel,
                reason,
            } => {
                warn!(
                    "REJECT | locker={} gpio={} reason={}",
                    locker_id,
                    channel,
                    reason.reason()
                );
            }
            AppEvent::Started { open_duration_ms } => {
                info!("START | open_duration={}ms", open_duration_ms);
            }
        }
    }
}
