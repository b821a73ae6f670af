//! End-to-end loop on the host: WiFi sim → MQTT sim → inbound channel →
//! CommandEngine → AppService → confirmations published back.
//!
//! The inbound channel is process-global, so everything that touches it
//! lives in the single test below.

use lockerbox::adapters::log_sink::LogEventSink;
use lockerbox::adapters::mqtt::{MessagingPort, MqttAdapter};
use lockerbox::adapters::wifi::{ConnectivityPort, WifiAdapter};
use lockerbox::app::service::AppService;
use lockerbox::config::{LOCKER_OPEN_DURATION_MS, SystemConfig};
use lockerbox::rpc::channels::try_take_inbound;
use lockerbox::rpc::engine::CommandEngine;

use crate::mock_hw::{ManualClock, MockHardware};

fn published(mqtt: &MqttAdapter) -> Vec<(String, String)> {
    mqtt.sim_published()
        .iter()
        .map(|(t, p)| (t.clone(), String::from_utf8(p.clone()).unwrap()))
        .collect()
}

#[test]
fn command_round_trip_through_simulated_broker() {
    while try_take_inbound().is_some() {}

    let cfg = SystemConfig::default();
    let clock = ManualClock::at(0);
    let mut hw = MockHardware::new();
    let mut wifi = WifiAdapter::new();
    let mut sinks = (
        LogEventSink::new(),
        MqttAdapter::new(&cfg, "locker-test".try_into().unwrap()),
    );
    let mut engine = CommandEngine::new(&cfg.command_topic);
    let mut app = AppService::new(LOCKER_OPEN_DURATION_MS);
    app.start(&mut sinks);

    // One loop iteration, as the firmware main loop runs it.
    let step = |wifi: &mut WifiAdapter,
                sinks: &mut (LogEventSink, MqttAdapter),
                engine: &mut CommandEngine,
                app: &mut AppService,
                hw: &mut MockHardware| {
        use lockerbox::app::ports::ClockPort;
        let now = clock.now_ms();
        wifi.poll(now);
        sinks.1.poll(now, wifi.is_connected());
        while let Some(msg) = try_take_inbound() {
            engine.dispatch(&msg.topic, &msg.payload, app, &clock, hw, sinks);
        }
        app.tick(&clock, hw, sinks);
    };

    // Nothing connects before WiFi is up; the broker drops the message.
    step(&mut wifi, &mut sinks, &mut engine, &mut app, &mut hw);
    assert!(!sinks.1.is_connected());
    assert!(!sinks.1.sim_inject("locker/commands", b"{}"));

    wifi.set_credentials("HomeNet", "password1").unwrap();
    wifi.connect().unwrap();
    step(&mut wifi, &mut sinks, &mut engine, &mut app, &mut hw);
    assert!(sinks.1.is_connected());
    assert_eq!(sinks.1.sim_subscriptions(), ["locker/commands".to_string()]);

    // Open A1 on GPIO 13.
    assert!(
        sinks
            .1
            .sim_inject("locker/commands", br#"{"action":"open","locker_id":"A1","gpio":13}"#)
    );
    // Messages on other topics never reach the loop.
    assert!(!sinks.1.sim_inject("other/topic", b"{}"));
    step(&mut wifi, &mut sinks, &mut engine, &mut app, &mut hw);
    assert!(hw.is_high(13));
    assert_eq!(
        published(&sinks.1),
        vec![(
            "locker/responses/A1".to_string(),
            r#"{"success":true,"locker_id":"A1","status":"open","gpio":13}"#.to_string()
        )]
    );

    // Garbage is dropped without a reply.
    assert!(sinks.1.sim_inject("locker/commands", b"{\"action\":"));
    clock.set(1_000);
    step(&mut wifi, &mut sinks, &mut engine, &mut app, &mut hw);
    assert_eq!(sinks.1.sim_published().len(), 1);
    assert_eq!(engine.stats().malformed, 1);

    // Auto-close fires after the open duration.
    clock.set(5_001);
    step(&mut wifi, &mut sinks, &mut engine, &mut app, &mut hw);
    assert!(!hw.is_high(13));
    assert_eq!(
        published(&sinks.1)[1],
        (
            "locker/responses/A1".to_string(),
            r#"{"success":true,"locker_id":"A1","status":"closed","gpio":13}"#.to_string()
        )
    );

    // Broker outage: a close confirmation emitted while offline is
    // dropped, the close itself still happens.
    assert!(
        sinks
            .1
            .sim_inject("locker/commands", br#"{"action":"open","locker_id":"B2","gpio":14}"#)
    );
    clock.set(6_000);
    step(&mut wifi, &mut sinks, &mut engine, &mut app, &mut hw);
    assert!(hw.is_high(14));
    sinks.1.sim_set_reachable(false);
    clock.set(11_001);
    step(&mut wifi, &mut sinks, &mut engine, &mut app, &mut hw);
    assert!(!hw.is_high(14));
    assert_eq!(sinks.1.sim_published().len(), 3);
    assert_eq!(sinks.1.stats().dropped, 1);

    // Broker back: reconnect only after strictly more than the interval.
    sinks.1.sim_set_reachable(true);
    clock.set(16_001);
    step(&mut wifi, &mut sinks, &mut engine, &mut app, &mut hw);
    assert!(!sinks.1.is_connected());
    clock.set(16_002);
    step(&mut wifi, &mut sinks, &mut engine, &mut app, &mut hw);
    assert!(sinks.1.is_connected());

    assert!(try_take_inbound().is_none());
}
