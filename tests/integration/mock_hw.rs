//! Mock adapters for integration tests.
//!
//! Records every actuator call so tests can assert on the full pin
//! history without touching real GPIO registers.

use std::cell::Cell;

use lockerbox::app::events::AppEvent;
use lockerbox::app::ports::{ActuatorPort, ClockPort, EventSink};
use lockerbox::locker::{Channel, Millis};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCall {
    High(Channel),
    Low(Channel),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<PinCall>,
}

impl MockHardware {
    pub fn new() -> Self {
        Self { calls: Vec::new() }
    }

    /// Level a line was last driven to (`false` if never touched).
    pub fn is_high(&self, channel: Channel) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match *c {
                PinCall::High(ch) if ch == channel => Some(true),
                PinCall::Low(ch) if ch == channel => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockHardware {
    fn assert_channel(&mut self, channel: Channel) {
        self.calls.push(PinCall::High(channel));
    }

    fn deassert_channel(&mut self, channel: Channel) {
        self.calls.push(PinCall::Low(channel));
    }
}

// ── ManualClock ───────────────────────────────────────────────

pub struct ManualClock(Cell<Millis>);

impl ManualClock {
    pub fn at(ms: Millis) -> Self {
        Self(Cell::new(ms))
    }

    pub fn set(&self, ms: Millis) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: Millis) {
        self.0.set(self.0.get().wrapping_add(ms));
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> Millis {
        self.0.get()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count_closed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::LockerClosed(_)))
            .count()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
