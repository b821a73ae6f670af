//! One-shot and on-demand GPIO setup.
//!
//! Configures the fixed board pins (status LED, reset button) once from
//! `main()`, and locker actuator lines lazily the first time a command
//! names them. Uses raw ESP-IDF sys calls; on the host every call hits a
//! simulated level table instead.

use embedded_hal::digital::PinState;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during peripheral configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed { pin: i32, rc: i32 },
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed { pin, rc } => {
                write!(f, "GPIO {} config failed (rc={})", pin, rc)
            }
        }
    }
}

/// Configure the status LED (output, LOW) and the reset button
/// (input, pull-up).
pub fn init_peripherals() -> Result<(), HwInitError> {
    configure_output(pins::LED_BUILTIN_GPIO)?;
    configure_input_pullup(pins::RESET_BUTTON_GPIO)?;
    info!(
        "hw_init: LED=GPIO{} button=GPIO{}",
        pins::LED_BUILTIN_GPIO,
        pins::RESET_BUTTON_GPIO
    );
    Ok(())
}

// ── ESP-IDF backend ───────────────────────────────────────────

/// Configure `pin` as a push-pull output and drive it LOW.
#[cfg(target_os = "espidf")]
pub fn configure_output(pin: i32) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config only touches the IO-mux registers of `pin`;
    // callers pass board-valid pin numbers from `pins`.
    let rc = unsafe { gpio_config(&cfg) };
    if rc != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed { pin, rc });
    }
    gpio_write(pin, PinState::Low);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn configure_input_pullup(pin: i32) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: see configure_output.
    let rc = unsafe { gpio_config(&cfg) };
    if rc != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed { pin, rc });
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, state: PinState) {
    let level = match state {
        PinState::High => 1,
        PinState::Low => 0,
    };
    // SAFETY: register write to an already-configured output pin;
    // main-loop only.
    unsafe {
        gpio_set_level(pin, level);
    }
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Reboot the chip. Does not return.
#[cfg(target_os = "espidf")]
pub fn restart() -> ! {
    info!("hw_init: restarting");
    esp_idf_svc::hal::reset::restart()
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU64, Ordering};

    /// Bit n = GPIO n is HIGH. Inputs idle HIGH (pull-ups).
    pub(super) static LEVELS: AtomicU64 = AtomicU64::new(u64::MAX);
    /// Bit n = GPIO n configured as output.
    pub(super) static OUTPUTS: AtomicU64 = AtomicU64::new(0);

    pub(super) fn set(pin: i32, high: bool) {
        let bit = 1u64 << pin;
        if high {
            LEVELS.fetch_or(bit, Ordering::Relaxed);
        } else {
            LEVELS.fetch_and(!bit, Ordering::Relaxed);
        }
    }

    pub(super) fn get(pin: i32) -> bool {
        LEVELS.load(Ordering::Relaxed) & (1u64 << pin) != 0
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn configure_output(pin: i32) -> Result<(), HwInitError> {
    if !(0..64).contains(&pin) {
        return Err(HwInitError::GpioConfigFailed { pin, rc: -1 });
    }
    sim::OUTPUTS.fetch_or(1u64 << pin, core::sync::atomic::Ordering::Relaxed);
    gpio_write(pin, PinState::Low);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn configure_input_pullup(pin: i32) -> Result<(), HwInitError> {
    if !(0..64).contains(&pin) {
        return Err(HwInitError::GpioConfigFailed { pin, rc: -1 });
    }
    sim::set(pin, true);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, state: PinState) {
    if (0..64).contains(&pin) {
        sim::set(pin, state == PinState::High);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    (0..64).contains(&pin) && sim::get(pin)
}

#[cfg(not(target_os = "espidf"))]
pub fn restart() -> ! {
    log::warn!("hw_init(sim): restart requested, exiting");
    std::process::exit(0)
}

/// Drive a simulated input, e.g. hold the reset button LOW.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_input(pin: i32, high: bool) {
    if (0..64).contains(&pin) {
        sim::set(pin, high);
    }
}

/// Whether `pin` has been configured as an output in simulation.
#[cfg(not(target_os = "espidf"))]
pub fn sim_is_output(pin: i32) -> bool {
    (0..64).contains(&pin)
        && sim::OUTPUTS.load(core::sync::atomic::Ordering::Relaxed) & (1u64 << pin) != 0
}
