//! Hardware adapter: bridges locker channels to GPIO lines.
//!
//! Implements [`ActuatorPort`] on top of `drivers::hw_init`. A channel
//! number *is* the GPIO number. Lines are configured as outputs the
//! first time they are asserted, matching the command-driven pin model:
//! no locker line is touched until a command names it.
//!
//! Writes are fire-and-forget; a line that cannot be configured is
//! logged and skipped, and the registry entry still times out normally.

use embedded_hal::digital::PinState;
use log::{error, info};

use crate::app::ports::ActuatorPort;
use crate::drivers::hw_init;
use crate::locker::Channel;
use crate::pins;

pub struct GpioActuator {
    /// Bit n = GPIO n configured as output.
    configured: u64,
    /// Bit n = GPIO n currently driven HIGH.
    asserted: u64,
}

impl Default for GpioActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioActuator {
    pub fn new() -> Self {
        Self {
            configured: 0,
            asserted: 0,
        }
    }

    pub fn is_asserted(&self, channel: Channel) -> bool {
        channel < 64 && self.asserted & (1u64 << channel) != 0
    }

    pub fn asserted_count(&self) -> u32 {
        self.asserted.count_ones()
    }

    fn ensure_output(&mut self, channel: Channel) -> bool {
        if !pins::is_actuator_gpio(channel) {
            error!("GPIO {} is not an actuator line, write skipped", channel);
            return false;
        }
        let bit = 1u64 << channel;
        if self.configured & bit != 0 {
            return true;
        }
        match hw_init::configure_output(i32::from(channel)) {
            Ok(()) => {
                self.configured |= bit;
                info!("GPIO {} configured as locker output", channel);
                true
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    fn drive(&mut self, channel: Channel, state: PinState) {
        if !self.ensure_output(channel) {
            return;
        }
        hw_init::gpio_write(i32::from(channel), state);
        let bit = 1u64 << channel;
        match state {
            PinState::High => self.asserted |= bit,
            PinState::Low => self.asserted &= !bit,
        }
    }
}

impl ActuatorPort for GpioActuator {
    fn assert_channel(&mut self, channel: Channel) {
        self.drive(channel, PinState::High);
    }

    fn deassert_channel(&mut self, channel: Channel) {
        self.drive(channel, PinState::Low);
    }
}
