//! Single-colour status LED on the built-in GPIO.
//!
//! | Link state     | Pattern                 |
//! |----------------|-------------------------|
//! | Provisioning   | fast blink (100 ms)     |
//! | Offline        | slow blink (1000 ms)    |
//! | WiFi only      | slow blink (1000 ms)    |
//! | Online         | solid on                |
//!
//! `update()` is non-blocking; call it every loop iteration.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the pin through `hw_init`.
//! On host/test: the simulated level table records the writes.

use embedded_hal::digital::PinState;

use crate::drivers::hw_init;

pub const FAST_BLINK_MS: u32 = 100;
pub const SLOW_BLINK_MS: u32 = 1_000;

/// Connectivity summary the LED reflects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Captive portal is up, waiting for credentials.
    Provisioning,
    /// No WiFi.
    Offline,
    /// WiFi up, broker not connected.
    WifiOnly,
    /// WiFi and broker connected.
    Online,
}

impl LinkStatus {
    pub fn from_links(provisioning: bool, wifi_up: bool, mqtt_up: bool) -> Self {
        match (provisioning, wifi_up, mqtt_up) {
            (true, _, _) => Self::Provisioning,
            (false, true, true) => Self::Online,
            (false, true, false) => Self::WifiOnly,
            (false, false, _) => Self::Offline,
        }
    }

    /// Toggle period, or `None` for solid on.
    pub fn blink_interval_ms(self) -> Option<u32> {
        match self {
            Self::Provisioning => Some(FAST_BLINK_MS),
            Self::Offline | Self::WifiOnly => Some(SLOW_BLINK_MS),
            Self::Online => None,
        }
    }
}

pub struct StatusLed {
    gpio: i32,
    lit: bool,
    last_toggle_ms: u32,
}

impl StatusLed {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            lit: false,
            last_toggle_ms: 0,
        }
    }

    pub fn update(&mut self, status: LinkStatus, now_ms: u32) {
        match status.blink_interval_ms() {
            None => self.set(true),
            Some(interval) => {
                if now_ms.wrapping_sub(self.last_toggle_ms) >= interval {
                    self.last_toggle_ms = now_ms;
                    self.set(!self.lit);
                }
            }
        }
    }

    pub fn off(&mut self) {
        self.set(false);
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    fn set(&mut self, on: bool) {
        if on != self.lit {
            hw_init::gpio_write(self.gpio, PinState::from(on));
            self.lit = on;
        }
    }
}
