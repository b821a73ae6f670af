//! Task watchdog for the main loop.
//!
//! Subscribes the calling task to the ESP-IDF TWDT; if the loop stops
//! feeding it for `timeout_ms` the chip panics and reboots, which drops
//! every actuator line back to its locked reset state.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    ESP_OK, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure,
    esp_task_wdt_reset,
};
use core::cell::Cell;
use log::{info, warn};

pub const DEFAULT_TIMEOUT_MS: u32 = 10_000;

pub struct Watchdog {
    timeout_ms: u32,
    subscribed: bool,
    feeds: Cell<u32>,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl Watchdog {
    pub fn new(timeout_ms: u32) -> Self {
        let subscribed = Self::platform_subscribe(timeout_ms);
        if subscribed {
            info!("Watchdog: armed ({} ms)", timeout_ms);
        } else {
            warn!("Watchdog: not armed, loop stalls will go unnoticed");
        }
        Self {
            timeout_ms,
            subscribed,
            feeds: Cell::new(0),
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn is_armed(&self) -> bool {
        self.subscribed
    }

    /// Number of feeds since boot (wraps).
    pub fn feeds(&self) -> u32 {
        self.feeds.get()
    }

    /// Call once per loop iteration.
    pub fn feed(&self) {
        if !self.subscribed {
            return;
        }
        self.platform_reset();
        self.feeds.set(self.feeds.get().wrapping_add(1));
    }

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(timeout_ms: u32) -> bool {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: called once from the main task at boot.
        let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
        if ret != ESP_OK {
            warn!("Watchdog: reconfigure returned {}", ret);
        }
        // SAFETY: a null handle subscribes the calling task.
        let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
        ret == ESP_OK
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(_timeout_ms: u32) -> bool {
        true
    }

    #[cfg(target_os = "espidf")]
    fn platform_reset(&self) {
        // SAFETY: resets the TWDT entry of the calling task.
        unsafe {
            esp_task_wdt_reset();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_reset(&self) {}
}
