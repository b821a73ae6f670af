//! Lockerbox firmware library.
//!
//! Exposes the locker core, the command path, and the adapters for
//! integration testing. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; on the host the
//! same modules compile against simulation backends.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod locker;
pub mod pins;
pub mod rpc;

pub mod adapters;
pub mod drivers;
