//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the [`LockerController`] and turns its results into
//! [`AppEvent`]s.  All I/O flows through port traits injected at call
//! sites, so the whole service runs on the host against mock adapters.
//!
//! ```text
//!   ClockPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │       AppService        │
//! ActuatorPort ◀──│  LockerController       │
//!                 └────────────────────────┘
//! ```
//!
//! The service is driven from a single loop: commands and sweeps never
//! run concurrently, so the registry needs no lock.

use log::{info, warn};

use crate::error::{self, Error};
use crate::locker::controller::LockerController;
use crate::locker::{Channel, Millis};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{ActuatorPort, ClockPort, EventSink};

/// Running totals since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockerStats {
    pub opened: u32,
    pub closed: u32,
    pub rejected: u32,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates the locker lifecycle.
pub struct AppService {
    lockers: LockerController,
    stats: LockerStats,
}

impl AppService {
    /// Construct the service with the auto-close policy.
    pub fn new(open_duration_ms: Millis) -> Self {
        Self {
            lockers: LockerController::new(open_duration_ms),
            stats: LockerStats::default(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        let open_duration_ms = self.lockers.open_duration_ms();
        sink.emit(&AppEvent::Started { open_duration_ms });
        info!("AppService started (auto-close after {} ms)", open_duration_ms);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one sweep at the current clock reading.
    ///
    /// Emits one `LockerClosed` per expired locker and returns how many
    /// were closed.
    pub fn tick(
        &mut self,
        clock: &impl ClockPort,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> usize {
        let closed = self.lockers.sweep(clock.now_ms(), hw);
        let count = closed.len();
        for conf in closed {
            self.stats.closed = self.stats.closed.wrapping_add(1);
            sink.emit(&AppEvent::LockerClosed(conf));
        }
        count
    }

    // ── Command handling ──────────────────────────────────────

    /// Process a decoded command.
    ///
    /// A refused open also emits `OpenRejected` so the requester gets an
    /// answer; a close of a locker that is not open is only logged.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        clock: &impl ClockPort,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> error::Result<()> {
        match cmd {
            AppCommand::OpenLocker { locker_id, channel } => {
                match self
                    .lockers
                    .open(channel, locker_id.clone(), clock.now_ms(), hw)
                {
                    Ok(conf) => {
                        self.stats.opened = self.stats.opened.wrapping_add(1);
                        sink.emit(&AppEvent::LockerOpened(conf));
                        Ok(())
                    }
                    Err(reason) => {
                        warn!("Locker {} open rejected: {}", locker_id, reason);
                        self.stats.rejected = self.stats.rejected.wrapping_add(1);
                        sink.emit(&AppEvent::OpenRejected {
                            locker_id,
                            channel,
                            reason,
                        });
                        Err(Error::Locker(reason))
                    }
                }
            }
            AppCommand::CloseLocker { channel } => match self.lockers.close_now(channel, hw) {
                Ok(conf) => {
                    self.stats.closed = self.stats.closed.wrapping_add(1);
                    sink.emit(&AppEvent::LockerClosed(conf));
                    Ok(())
                }
                Err(e) => {
                    warn!("Close ignored: {}", e);
                    Err(e.into())
                }
            },
        }
    }

    /// Re-lock everything (factory reset path). Returns how many closed.
    pub fn close_all(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) -> usize {
        let closed = self.lockers.close_all(hw);
        let count = closed.len();
        for conf in closed {
            self.stats.closed = self.stats.closed.wrapping_add(1);
            sink.emit(&AppEvent::LockerClosed(conf));
        }
        if count > 0 {
            info!("Force-closed {} locker(s)", count);
        }
        count
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_open(&self, channel: Channel) -> bool {
        self.lockers.is_open(channel)
    }

    pub fn open_count(&self) -> usize {
        self.lockers.open_count()
    }

    pub fn stats(&self) -> LockerStats {
        self.stats
    }

    pub fn lockers(&self) -> &LockerController {
        &self.lockers
    }
}
