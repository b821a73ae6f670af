//! Lifecycle controller — enforces the open-duration policy.
//!
//! Each compartment moves Closed → Open → Closed. The Open transition is
//! requested from outside ([`LockerController::open`]); the Closed
//! transition normally comes only from [`LockerController::sweep`], once
//! the fixed open duration has elapsed. Actuator writes are treated as
//! instantaneous, so there is no intermediate "opening" state.

use heapless::Vec;
use log::info;

use crate::app::ports::ActuatorPort;
use crate::config::MAX_OPEN_LOCKERS;
use crate::error::LockerError;

use super::registry::{LockerEntry, LockerRegistry};
use super::{Channel, LockerConfirmation, LockerId, LockerStatus, Millis};

/// Confirmations produced by one sweep. Bounded by the registry size.
pub type Confirmations = Vec<LockerConfirmation, MAX_OPEN_LOCKERS>;

/// Owns the open-locker registry and the fixed open duration.
#[derive(Debug)]
pub struct LockerController {
    registry: LockerRegistry,
    open_duration_ms: Millis,
}

impl LockerController {
    pub fn new(open_duration_ms: Millis) -> Self {
        Self {
            registry: LockerRegistry::new(),
            open_duration_ms,
        }
    }

    /// Unlock `channel` and start its auto-close timer at `now`.
    ///
    /// A channel that is already open is rejected with
    /// [`LockerError::DuplicateChannel`]; the existing entry keeps its
    /// id and its original timestamp.
    pub fn open(
        &mut self,
        channel: Channel,
        locker_id: LockerId,
        now: Millis,
        hw: &mut impl ActuatorPort,
    ) -> Result<LockerConfirmation, LockerError> {
        // Insert before touching the pin so a rejected request leaves
        // the line exactly as it was.
        self.registry.insert(channel, locker_id.clone(), now)?;
        hw.assert_channel(channel);
        info!("Locker {} opened (GPIO {} set HIGH)", locker_id, channel);

        Ok(LockerConfirmation {
            locker_id,
            channel,
            status: LockerStatus::Open,
        })
    }

    /// Close every entry whose open time exceeds the open duration.
    ///
    /// All entries expired at `now` are closed before this returns.
    pub fn sweep(&mut self, now: Millis, hw: &mut impl ActuatorPort) -> Confirmations {
        let expired: Vec<Channel, MAX_OPEN_LOCKERS> = self
            .registry
            .scan_expired(now, self.open_duration_ms)
            .collect();
        self.close_channels(expired, hw)
    }

    /// Re-lock `channel` immediately, ahead of its timer.
    pub fn close_now(
        &mut self,
        channel: Channel,
        hw: &mut impl ActuatorPort,
    ) -> Result<LockerConfirmation, LockerError> {
        let entry = self
            .registry
            .remove(channel)
            .ok_or(LockerError::NotOpen(channel))?;
        Ok(Self::close_entry(entry, hw))
    }

    /// Re-lock every open compartment. Used before a factory-reset restart.
    pub fn close_all(&mut self, hw: &mut impl ActuatorPort) -> Confirmations {
        let open: Vec<Channel, MAX_OPEN_LOCKERS> =
            self.registry.iter().map(|e| e.channel).collect();
        self.close_channels(open, hw)
    }

    /// One confirmation per channel still registered. `channels` and
    /// [`Confirmations`] share the registry capacity.
    fn close_channels(
        &mut self,
        channels: Vec<Channel, MAX_OPEN_LOCKERS>,
        hw: &mut impl ActuatorPort,
    ) -> Confirmations {
        channels
            .into_iter()
            .filter_map(|channel| {
                let entry = self.registry.remove(channel)?;
                Some(Self::close_entry(entry, hw))
            })
            .collect()
    }

    pub fn is_open(&self, channel: Channel) -> bool {
        self.registry.contains(channel)
    }

    pub fn open_count(&self) -> usize {
        self.registry.len()
    }

    pub fn open_duration_ms(&self) -> Millis {
        self.open_duration_ms
    }

    /// Read-only view of the registry (diagnostics and tests).
    pub fn registry(&self) -> &LockerRegistry {
        &self.registry
    }

    fn close_entry(entry: LockerEntry, hw: &mut impl ActuatorPort) -> LockerConfirmation {
        hw.deassert_channel(entry.channel);
        info!(
            "Locker {} closed (GPIO {} set LOW)",
            entry.locker_id, entry.channel
        );
        LockerConfirmation {
            locker_id: entry.locker_id,
            channel: entry.channel,
            status: LockerStatus::Closed,
        }
    }
}
