//! GPIO assignments for the locker controller board (ESP32-WROOM).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Locker channels are not fixed here: each
//! command names its own line, and [`is_actuator_gpio`] decides whether
//! that line may be driven.

// ---------------------------------------------------------------------------
// Fixed board functions
// ---------------------------------------------------------------------------

/// On-board status LED (active HIGH).
pub const LED_BUILTIN_GPIO: i32 = 2;

/// BOOT button, active LOW with internal pull-up. Held for 5 s it
/// triggers a factory reset.
pub const RESET_BUTTON_GPIO: i32 = 0;

/// UART0 console.
pub const UART_TX_GPIO: i32 = 1;
pub const UART_RX_GPIO: i32 = 3;

// ---------------------------------------------------------------------------
// Actuator lines
// ---------------------------------------------------------------------------

/// Output-capable pins that are free for lock solenoids / relays.
///
/// Excludes the LED, the BOOT strap, UART0, the SPI-flash bus (6–11),
/// the input-only pins (34–39) and numbers the chip does not bond out.
pub const ACTUATOR_GPIOS: [u8; 18] = [
    4, 5, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 25, 26, 27, 32, 33,
];

/// Whether `gpio` may be used as a locker channel.
pub fn is_actuator_gpio(gpio: u8) -> bool {
    ACTUATOR_GPIOS.contains(&gpio)
}
