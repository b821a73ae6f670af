//! Property tests for the locker timing invariants and the command decoder.
//!
//! Runs on host (x86_64) only; proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use lockerbox::app::ports::ActuatorPort;
use lockerbox::config::{LOCKER_OPEN_DURATION_MS, MAX_OPEN_LOCKERS};
use lockerbox::locker::controller::LockerController;
use lockerbox::locker::{Channel, locker_id};
use lockerbox::pins::ACTUATOR_GPIOS;
use lockerbox::rpc::codec::decode_command;
use proptest::prelude::*;

struct NullPins;
impl ActuatorPort for NullPins {
    fn assert_channel(&mut self, _channel: Channel) {}
    fn deassert_channel(&mut self, _channel: Channel) {}
}

const D: u32 = LOCKER_OPEN_DURATION_MS;

// ── Expiry boundary ──────────────────────────────────────────

proptest! {
    /// Whatever the start time, a sweep inside the window never closes,
    /// and the first sweep past it closes exactly once.
    #[test]
    fn closes_exactly_once_after_duration(
        start in any::<u32>(),
        early in 0u32..=D,
    ) {
        let mut ctl = LockerController::new(D);
        let mut hw = NullPins;
        ctl.open(13, locker_id("A1").unwrap(), start, &mut hw).unwrap();

        prop_assert!(ctl.sweep(start.wrapping_add(early), &mut hw).is_empty());
        prop_assert!(ctl.is_open(13));

        let now = start.wrapping_add(D + 1);
        let closed = ctl.sweep(now, &mut hw);
        prop_assert_eq!(closed.len(), 1);
        prop_assert_eq!(closed[0].channel, 13);
        prop_assert_eq!(closed[0].locker_id.as_str(), "A1");

        // Idempotent at the same instant.
        prop_assert!(ctl.sweep(now, &mut hw).is_empty());
    }

    /// Opens just below the wrap point still expire once the true
    /// elapsed time exceeds the duration.
    #[test]
    fn wraparound_expiry(
        before_wrap in 1u32..=D,
        extra in 1u32..1_000,
    ) {
        let start = u32::MAX - before_wrap + 1;
        let mut ctl = LockerController::new(D);
        let mut hw = NullPins;
        ctl.open(4, locker_id("W").unwrap(), start, &mut hw).unwrap();

        // `now` has wrapped to a small value.
        let now = start.wrapping_add(D + extra);
        prop_assert!(now < start);
        prop_assert_eq!(ctl.sweep(now, &mut hw).len(), 1);
    }
}

// ── Registry accounting ──────────────────────────────────────

proptest! {
    /// N opens at distinct times, then M sweeps that each expire exactly
    /// one entry, leave N − M entries.
    #[test]
    fn size_after_n_opens_and_m_sweeps(
        n in 1usize..=MAX_OPEN_LOCKERS,
        m_frac in 0.0f64..=1.0,
    ) {
        let m = ((n as f64) * m_frac) as usize;
        let mut ctl = LockerController::new(D);
        let mut hw = NullPins;
        for (i, &gpio) in ACTUATOR_GPIOS.iter().take(n).enumerate() {
            let id = format!("L{i}");
            ctl.open(gpio, locker_id(&id).unwrap(), (i as u32) * 10, &mut hw).unwrap();
        }
        prop_assert_eq!(ctl.open_count(), n);

        for k in 0..m {
            let now = (k as u32) * 10 + D + 1;
            prop_assert_eq!(ctl.sweep(now, &mut hw).len(), 1);
        }
        prop_assert_eq!(ctl.open_count(), n - m);
    }

    /// A rejected duplicate never changes the registry.
    #[test]
    fn duplicate_open_leaves_registry_unchanged(
        first_at in any::<u32>(),
        second_at in any::<u32>(),
    ) {
        let mut ctl = LockerController::new(D);
        let mut hw = NullPins;
        ctl.open(5, locker_id("A").unwrap(), first_at, &mut hw).unwrap();
        prop_assert!(ctl.open(5, locker_id("B").unwrap(), second_at, &mut hw).is_err());

        let entry = ctl.registry().find_by_channel(5).unwrap();
        prop_assert_eq!(entry.locker_id.as_str(), "A");
        prop_assert_eq!(entry.opened_at(), first_at);
        prop_assert_eq!(ctl.open_count(), 1);
    }
}

// ── Command decoder robustness ───────────────────────────────

proptest! {
    /// Arbitrary bytes never panic the decoder.
    #[test]
    fn decoder_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_command(&data);
    }

    /// Any accepted open names a valid actuator line and a non-empty id.
    #[test]
    fn accepted_opens_are_well_formed(
        id in "[ -~]{0,40}",
        gpio in -5i64..50,
    ) {
        let payload = serde_json::json!({"action": "open", "locker_id": id, "gpio": gpio});
        if let Ok(lockerbox::app::commands::AppCommand::OpenLocker { locker_id, channel }) =
            decode_command(payload.to_string().as_bytes())
        {
            prop_assert!(lockerbox::pins::is_actuator_gpio(channel));
            prop_assert!(!locker_id.is_empty());
            prop_assert!(!locker_id.contains(['/', '+', '#']));
        }
    }
}
