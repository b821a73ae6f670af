//! Factory-reset button driver.
//!
//! ## Hardware
//!
//! BOOT button, active LOW with the internal pull-up. The main loop
//! samples the level every iteration and passes it to [`ResetButton::tick`];
//! no ISR is needed at a 10 ms loop period.
//!
//! ## Gesture detection
//!
//! | Gesture | Condition                         | Event          |
//! |---------|-----------------------------------|----------------|
//! | Hold    | Continuously LOW for >= 5 s       | `FactoryReset` |
//!
//! The event fires once per hold; the button must be released before
//! it can fire again. Presses shorter than the debounce window are
//! ignored.

use crate::drivers::hw_init;

const DEBOUNCE_MS: u32 = 50;
pub const FACTORY_RESET_HOLD_MS: u32 = 5_000;

/// Events emitted after gesture classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    FactoryReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldState {
    Released,
    Held { since_ms: u32 },
    /// Event already fired; wait for release.
    Latched,
}

pub struct ResetButton {
    gpio: i32,
    state: HoldState,
    hold_ms: u32,
}

impl ResetButton {
    pub fn new(gpio: i32) -> Self {
        Self::with_hold_time(gpio, FACTORY_RESET_HOLD_MS)
    }

    pub fn with_hold_time(gpio: i32, hold_ms: u32) -> Self {
        Self {
            gpio,
            state: HoldState::Released,
            hold_ms: hold_ms.max(DEBOUNCE_MS),
        }
    }

    /// GPIO pin this button is attached to.
    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    /// Whether the button is held right now (active LOW).
    pub fn is_pressed(&self) -> bool {
        !hw_init::gpio_read(self.gpio)
    }

    /// Sample the pin and advance the state machine.
    pub fn poll(&mut self, now_ms: u32) -> Option<ButtonEvent> {
        let pressed = self.is_pressed();
        self.tick(pressed, now_ms)
    }

    /// Advance with an explicit level; `poll` without the GPIO read.
    pub fn tick(&mut self, pressed: bool, now_ms: u32) -> Option<ButtonEvent> {
        match (self.state, pressed) {
            (_, false) => {
                self.state = HoldState::Released;
                None
            }
            (HoldState::Released, true) => {
                self.state = HoldState::Held { since_ms: now_ms };
                None
            }
            (HoldState::Held { since_ms }, true) => {
                if now_ms.wrapping_sub(since_ms) >= self.hold_ms {
                    self.state = HoldState::Latched;
                    Some(ButtonEvent::FactoryReset)
                } else {
                    None
                }
            }
            (HoldState::Latched, true) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_events_without_press() {
        let mut btn = ResetButton::new(0);
        assert_eq!(btn.tick(false, 100), None);
        assert_eq!(btn.tick(false, 10_000), None);
    }

    #[test]
    fn short_press_ignored() {
        let mut btn = ResetButton::new(0);
        btn.tick(true, 1_000);
        assert_eq!(btn.tick(true, 5_999), None);
        assert_eq!(btn.tick(false, 6_000), None);
        assert_eq!(btn.tick(true, 6_010), None);
    }

    #[test]
    fn long_hold_fires_once() {
        let mut btn = ResetButton::new(0);
        btn.tick(true, 1_000);
        assert_eq!(btn.tick(true, 6_000), Some(ButtonEvent::FactoryReset));
        assert_eq!(btn.tick(true, 12_000), None);
        btn.tick(false, 12_010);
        btn.tick(true, 12_020);
        assert_eq!(btn.tick(true, 17_020), Some(ButtonEvent::FactoryReset));
    }

    #[test]
    fn hold_across_wraparound() {
        let mut btn = ResetButton::new(0);
        btn.tick(true, u32::MAX - 1_000);
        assert_eq!(btn.tick(true, 3_000), None);
        assert_eq!(btn.tick(true, 4_000), Some(ButtonEvent::FactoryReset));
    }

    #[test]
    fn poll_reads_active_low_pin() {
        // GPIO 27 on the simulated bank belongs to this test.
        hw_init::sim_set_input(27, false);
        let mut btn = ResetButton::with_hold_time(27, 100);
        assert!(btn.is_pressed());
        assert_eq!(btn.poll(0), None);
        assert_eq!(btn.poll(100), Some(ButtonEvent::FactoryReset));
        hw_init::sim_set_input(27, true);
        assert_eq!(btn.poll(200), None);
    }
}
