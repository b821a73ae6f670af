//! ESP32 time adapter.
//!
//! Implements [`ClockPort`] for the locker core.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.
//!
//! Milliseconds are truncated to `u32` and wrap after ~49.7 days; every
//! consumer compares readings with `wrapping_sub`.

use crate::app::ports::ClockPort;
use crate::locker::Millis;

pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: reads the free-running system timer.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Seconds since boot (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.uptime_us() / 1_000_000
    }
}

impl ClockPort for Esp32TimeAdapter {
    fn now_ms(&self) -> Millis {
        (self.uptime_us() / 1_000) as Millis
    }
}
