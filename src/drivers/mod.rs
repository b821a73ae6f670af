//! GPIO setup, status LED, reset button, and watchdog.

pub mod button;
pub mod hw_init;
pub mod status_led;
pub mod watchdog;
