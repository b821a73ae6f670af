//! Application core — pure domain logic, zero I/O.
//!
//! Orchestrates the locker lifecycle: command handling, the periodic
//! auto-close sweep, and lifecycle events. All interaction with hardware
//! and the network happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
