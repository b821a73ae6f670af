//! Integration tests for the portal → NVS → WiFi provisioning flow.
//!
//! Verifies the end-to-end sequence: the portal form is parsed and
//! signalled, the loop persists credentials and broker settings, and
//! the next boot connects in station mode with them.

use lockerbox::adapters::nvs::NvsAdapter;
use lockerbox::adapters::portal::{FormError, PORTAL_SUBMISSION, parse_form};
use lockerbox::adapters::wifi::{
    ConnectivityError, ConnectivityPort, PORTAL_FALLBACK_ATTEMPTS, PORTAL_WINDOW_MS, WifiAdapter,
    WifiState,
};
use lockerbox::app::ports::{ConfigError, ConfigPort};
use lockerbox::config::SystemConfig;
use lockerbox::drivers::status_led::LinkStatus;

#[test]
fn portal_submission_persists_and_connects() {
    let mut nvs = NvsAdapter::new().unwrap();
    assert!(!nvs.has_wifi_credentials());

    // First boot: no credentials, radio comes up as the portal AP.
    let cfg = nvs.load().unwrap_or_default();
    let mut wifi = WifiAdapter::new();
    assert_eq!(wifi.connect(), Err(ConnectivityError::NoCredentials));
    wifi.start_provisioning(&cfg.portal_ssid).unwrap();
    assert!(wifi.is_provisioning());
    assert_eq!(
        LinkStatus::from_links(wifi.is_provisioning(), wifi.is_connected(), false),
        LinkStatus::Provisioning
    );

    // The HTTP handler parses and signals; the loop takes it.
    let sub = parse_form(b"ssid=Shop+WiFi&password=hunter22&mqtt_host=10.1.2.3&mqtt_port=1884")
        .unwrap();
    PORTAL_SUBMISSION.signal(sub);
    let sub = PORTAL_SUBMISSION.try_take().unwrap();
    assert!(PORTAL_SUBMISSION.try_take().is_none());

    nvs.store_wifi_credentials(&sub.credentials).unwrap();
    let mut updated = cfg.clone();
    sub.apply_to(&mut updated);
    nvs.save(&updated).unwrap();

    // Next boot: station mode with the stored credentials.
    let creds = nvs.load_wifi_credentials().unwrap();
    assert_eq!(creds.ssid.as_str(), "Shop WiFi");
    let loaded = nvs.load().unwrap();
    assert_eq!(loaded.mqtt_host, "10.1.2.3");
    assert_eq!(loaded.mqtt_port, 1884);
    assert_eq!(loaded.command_topic, SystemConfig::default().command_topic);

    let mut wifi = WifiAdapter::new();
    wifi.set_credentials(&creds.ssid, &creds.password).unwrap();
    wifi.connect().unwrap();
    assert_eq!(wifi.state(), WifiState::Connecting);
    wifi.poll(0);
    assert_eq!(wifi.state(), WifiState::Connected);
    assert!(wifi.rssi().is_some());
}

#[test]
fn rejected_form_changes_nothing() {
    assert_eq!(parse_form(b"ssid=Net&password=short"), Err(FormError::InvalidPassword));
    assert_eq!(
        parse_form(b"ssid=toolong-toolong-toolong-toolong-x"),
        Err(FormError::InvalidSsid)
    );
}

#[test]
fn broker_override_still_validated_on_save() {
    let nvs = NvsAdapter::new().unwrap();
    let sub = parse_form(b"ssid=Net&mqtt_host=bad_host!").unwrap();
    let mut cfg = SystemConfig::default();
    sub.apply_to(&mut cfg);
    assert!(matches!(nvs.save(&cfg), Err(ConfigError::ValidationFailed(_))));
    // Nothing was written, so the defaults still apply.
    assert_eq!(nvs.load(), Ok(SystemConfig::default()));
}

#[test]
fn factory_reset_returns_to_provisioning() {
    let mut nvs = NvsAdapter::new().unwrap();
    let sub = parse_form(b"ssid=Net&password=password1").unwrap();
    nvs.store_wifi_credentials(&sub.credentials).unwrap();
    let custom = SystemConfig {
        mqtt_host: "broker.lan".into(),
        ..SystemConfig::default()
    };
    nvs.save(&custom).unwrap();
    assert_eq!(nvs.load().unwrap(), custom);

    nvs.factory_reset().unwrap();
    assert!(!nvs.has_wifi_credentials());
    assert!(nvs.load_wifi_credentials().is_none());
    assert_eq!(nvs.load().unwrap(), SystemConfig::default());
}

#[test]
fn wifi_reconnect_backs_off() {
    let mut wifi = WifiAdapter::new();
    wifi.set_credentials("Net", "").unwrap();
    wifi.sim_fail_next(2);
    assert!(wifi.connect().is_err());

    wifi.poll(0); // opens the backoff window
    wifi.poll(1_999);
    assert_eq!(wifi.sim_connect_attempts(), 1);
    wifi.poll(2_000);
    assert_eq!(wifi.sim_connect_attempts(), 2);
    assert_eq!(wifi.backoff_ms(), 4_000);
    wifi.poll(6_000);
    assert_eq!(wifi.state(), WifiState::Connecting);
    wifi.poll(6_100);
    assert!(wifi.is_connected());
    assert_eq!(wifi.backoff_ms(), 2_000);
}

#[test]
fn unreachable_network_reopens_portal() {
    let cfg = SystemConfig::default();
    let mut wifi = WifiAdapter::new();
    wifi.set_credentials("Moved Away", "password1").unwrap();
    wifi.set_portal_fallback(&cfg.portal_ssid).unwrap();
    wifi.sim_fail_next(u32::MAX);
    assert!(wifi.connect().is_err());

    let mut now = 0u32;
    wifi.poll(now);
    for _ in 0..PORTAL_FALLBACK_ATTEMPTS {
        if wifi.is_provisioning() {
            break;
        }
        assert!(matches!(wifi.state(), WifiState::Reconnecting { .. }));
        now += wifi.backoff_ms();
        wifi.poll(now);
    }
    assert_eq!(wifi.state(), WifiState::Provisioning);
    assert_eq!(wifi.sim_connect_attempts(), PORTAL_FALLBACK_ATTEMPTS);
    assert_eq!(
        LinkStatus::from_links(wifi.is_provisioning(), wifi.is_connected(), false),
        LinkStatus::Provisioning
    );

    // Nobody submits the form and the network comes back: the stored
    // credentials get another try once the portal window has passed.
    wifi.sim_fail_next(0);
    wifi.poll(now + PORTAL_WINDOW_MS - 1);
    assert!(wifi.is_provisioning());
    wifi.poll(now + PORTAL_WINDOW_MS);
    assert_eq!(wifi.state(), WifiState::Connecting);
    wifi.poll(now + PORTAL_WINDOW_MS + 100);
    assert!(wifi.is_connected());
    assert_eq!(wifi.sim_connect_attempts(), PORTAL_FALLBACK_ATTEMPTS + 1);
}
