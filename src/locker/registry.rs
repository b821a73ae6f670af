//! Open-locker registry.
//!
//! A flat, fixed-capacity sequence of [`LockerEntry`] values, one per
//! compartment whose actuator line is currently asserted. At most one
//! entry exists per channel.
//!
//! Entries are addressed by their `channel`, never by position, so a
//! removal can never shift another caller's handle. Sweeps collect the
//! expired channels first and remove them afterwards.

use heapless::Vec;

use crate::config::MAX_OPEN_LOCKERS;
use crate::error::LockerError;

use super::{Channel, LockerId, Millis};

/// One unlocked compartment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockerEntry {
    pub channel: Channel,
    pub locker_id: LockerId,
    opened_at: Millis,
}

impl LockerEntry {
    /// Timestamp captured when the entry was inserted.
    pub fn opened_at(&self) -> Millis {
        self.opened_at
    }

    /// Milliseconds since the entry was opened, correct across a
    /// timer wrap.
    pub fn elapsed_ms(&self, now: Millis) -> Millis {
        now.wrapping_sub(self.opened_at)
    }

    /// Strictly more than `open_duration` has elapsed.
    pub fn is_expired(&self, now: Millis, open_duration: Millis) -> bool {
        self.elapsed_ms(now) > open_duration
    }
}

/// Registry of currently-open lockers, in insertion order.
#[derive(Debug, Default)]
pub struct LockerRegistry {
    entries: Vec<LockerEntry, MAX_OPEN_LOCKERS>,
}

impl LockerRegistry {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append an entry for `channel` opened at `now`.
    ///
    /// Fails without touching existing entries if the channel is already
    /// present or every slot is taken.
    pub fn insert(
        &mut self,
        channel: Channel,
        locker_id: LockerId,
        now: Millis,
    ) -> Result<(), LockerError> {
        if self.contains(channel) {
            return Err(LockerError::DuplicateChannel(channel));
        }
        self.entries
            .push(LockerEntry {
                channel,
                locker_id,
                opened_at: now,
            })
            .map_err(|_| LockerError::RegistryFull)
    }

    /// Channels of every entry whose open time exceeds `open_duration`.
    ///
    /// The iterator is lazy and borrows the registry; calling this again
    /// restarts the scan from the first entry.
    pub fn scan_expired(
        &self,
        now: Millis,
        open_duration: Millis,
    ) -> impl Iterator<Item = Channel> + '_ {
        self.entries
            .iter()
            .filter(move |e| e.is_expired(now, open_duration))
            .map(|e| e.channel)
    }

    /// Remove the entry for `channel`.
    ///
    /// A channel that is no longer present is a no-op returning `None`,
    /// so a stale handle from an earlier scan is harmless.
    pub fn remove(&mut self, channel: Channel) -> Option<LockerEntry> {
        let idx = self.entries.iter().position(|e| e.channel == channel)?;
        Some(self.entries.remove(idx))
    }

    pub fn find_by_channel(&self, channel: Channel) -> Option<&LockerEntry> {
        self.entries.iter().find(|e| e.channel == channel)
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.find_by_channel(channel).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LockerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }
}
