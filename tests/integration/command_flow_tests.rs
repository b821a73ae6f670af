//! Command path: raw JSON payload → CommandEngine → AppService → pins.

use lockerbox::app::events::AppEvent;
use lockerbox::app::service::AppService;
use lockerbox::config::{LOCKER_OPEN_DURATION_MS, MAX_OPEN_LOCKERS, SystemConfig};
use lockerbox::error::LockerError;
use lockerbox::pins::ACTUATOR_GPIOS;
use lockerbox::rpc::codec::{DecodeError, LockerResponse};
use lockerbox::rpc::engine::{CommandEngine, DispatchOutcome};

use crate::mock_hw::{ManualClock, MockHardware, PinCall, RecordingSink};

struct Rig {
    engine: CommandEngine,
    app: AppService,
    clock: ManualClock,
    hw: MockHardware,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self {
            engine: CommandEngine::new(&SystemConfig::default().command_topic),
            app: AppService::new(LOCKER_OPEN_DURATION_MS),
            clock: ManualClock::at(0),
            hw: MockHardware::new(),
            sink: RecordingSink::new(),
        }
    }

    fn send(&mut self, payload: &str) -> DispatchOutcome {
        self.send_on("locker/commands", payload)
    }

    fn send_on(&mut self, topic: &str, payload: &str) -> DispatchOutcome {
        self.engine.dispatch(
            topic,
            payload.as_bytes(),
            &mut self.app,
            &self.clock,
            &mut self.hw,
            &mut self.sink,
        )
    }

    fn sweep(&mut self) -> usize {
        self.app.tick(&self.clock, &mut self.hw, &mut self.sink)
    }

    fn last_response(&self) -> String {
        let event = self.sink.events.last().unwrap();
        let resp = LockerResponse::from_event(event).unwrap();
        String::from_utf8(resp.to_json().unwrap()).unwrap()
    }
}

#[test]
fn open_command_unlocks_then_auto_closes() {
    let mut rig = Rig::new();

    let out = rig.send(r#"{"action":"open","locker_id":"A1","gpio":13}"#);
    assert_eq!(out, DispatchOutcome::Applied);
    assert!(rig.hw.is_high(13));
    assert_eq!(
        rig.last_response(),
        r#"{"success":true,"locker_id":"A1","status":"open","gpio":13}"#
    );

    rig.clock.set(4_999);
    assert_eq!(rig.sweep(), 0);
    rig.clock.set(5_001);
    assert_eq!(rig.sweep(), 1);
    assert!(!rig.hw.is_high(13));
    assert_eq!(
        rig.last_response(),
        r#"{"success":true,"locker_id":"A1","status":"closed","gpio":13}"#
    );
}

#[test]
fn duplicate_open_answers_with_rejection() {
    let mut rig = Rig::new();
    rig.send(r#"{"action":"open","locker_id":"A","gpio":4}"#);
    rig.clock.set(1_000);

    let out = rig.send(r#"{"action":"open","locker_id":"B","gpio":4}"#);
    assert_eq!(out, DispatchOutcome::Refused(LockerError::DuplicateChannel(4).into()));
    assert_eq!(
        rig.last_response(),
        r#"{"success":false,"locker_id":"B","status":"open","gpio":4,"error":"already_open"}"#
    );
    assert_eq!(rig.hw.calls, vec![PinCall::High(4)]);
}

#[test]
fn close_command_relocks_early() {
    let mut rig = Rig::new();
    rig.send(r#"{"action":"open","locker_id":"A","gpio":4}"#);
    rig.clock.set(200);

    assert_eq!(rig.send(r#"{"action":"CLOSE","gpio":4}"#), DispatchOutcome::Applied);
    assert_eq!(rig.hw.calls, vec![PinCall::High(4), PinCall::Low(4)]);

    // A second close finds nothing and publishes nothing.
    let before = rig.sink.events.len();
    assert_eq!(
        rig.send(r#"{"action":"close","gpio":4}"#),
        DispatchOutcome::Refused(LockerError::NotOpen(4).into())
    );
    assert_eq!(rig.sink.events.len(), before);
}

#[test]
fn malformed_commands_are_silent() {
    let mut rig = Rig::new();
    let cases = [
        ("not json", DecodeError::InvalidJson),
        (r#"{"locker_id":"A","gpio":4}"#, DecodeError::MissingAction),
        (r#"{"action":"jiggle","gpio":4}"#, DecodeError::UnknownAction),
        (r#"{"action":"open","gpio":4}"#, DecodeError::MissingLockerId),
        (r#"{"action":"open","locker_id":"a/b","gpio":4}"#, DecodeError::InvalidLockerId),
        (r#"{"action":"open","locker_id":"A"}"#, DecodeError::MissingChannel),
        (r#"{"action":"open","locker_id":"A","gpio":0}"#, DecodeError::MissingChannel),
        (r#"{"action":"open","locker_id":"A","gpio":2}"#, DecodeError::InvalidChannel(2)),
        (r#"{"action":"open","locker_id":"A","gpio":300}"#, DecodeError::InvalidChannel(300)),
    ];
    for (payload, expected) in cases {
        assert_eq!(rig.send(payload), DispatchOutcome::Malformed(expected), "{payload}");
    }
    assert!(rig.sink.events.is_empty());
    assert!(rig.hw.calls.is_empty());
    assert_eq!(rig.engine.stats().malformed, cases.len() as u32);
}

#[test]
fn foreign_topic_ignored() {
    let mut rig = Rig::new();
    let out = rig.send_on(
        "locker/responses/A",
        r#"{"action":"open","locker_id":"A","gpio":4}"#,
    );
    assert_eq!(out, DispatchOutcome::IgnoredTopic);
    assert!(rig.hw.calls.is_empty());
}

#[test]
fn registry_full_rejects_without_disturbing_others() {
    let mut rig = Rig::new();
    for (i, gpio) in ACTUATOR_GPIOS.iter().take(MAX_OPEN_LOCKERS).enumerate() {
        let payload = format!(r#"{{"action":"open","locker_id":"L{i}","gpio":{gpio}}}"#);
        assert_eq!(rig.send(&payload), DispatchOutcome::Applied);
    }

    let spare = ACTUATOR_GPIOS[MAX_OPEN_LOCKERS];
    let payload = format!(r#"{{"action":"open","locker_id":"X","gpio":{spare}}}"#);
    assert_eq!(
        rig.send(&payload),
        DispatchOutcome::Refused(LockerError::RegistryFull.into())
    );
    assert!(!rig.hw.is_high(spare));
    assert!(matches!(
        rig.sink.events.last(),
        Some(AppEvent::OpenRejected { reason: LockerError::RegistryFull, .. })
    ));

    rig.clock.set(5_001);
    assert_eq!(rig.sweep(), MAX_OPEN_LOCKERS);
    assert_eq!(rig.sink.count_closed(), MAX_OPEN_LOCKERS);
    assert_eq!(rig.app.open_count(), 0);
}

#[test]
fn staggered_opens_close_on_their_own_timers() {
    let mut rig = Rig::new();
    rig.send(r#"{"action":"open","locker_id":"A","gpio":4}"#);
    rig.clock.advance(1_000);
    rig.send(r#"{"action":"open","locker_id":"B","gpio":5}"#);

    rig.clock.advance(4_001);
    assert_eq!(rig.sweep(), 1);
    assert_eq!(rig.sink.count_closed(), 1);
    assert!(!rig.hw.is_high(4));
    assert!(rig.hw.is_high(5));

    // B has been open exactly the duration: not yet.
    rig.clock.advance(999);
    assert_eq!(rig.sweep(), 0);
    rig.clock.advance(1);
    assert_eq!(rig.sweep(), 1);
    assert_eq!(rig.sink.count_closed(), 2);
    assert!(!rig.hw.is_high(5));
}
