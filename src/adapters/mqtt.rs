//! MQTT transport adapter.
//!
//! Implements [`MessagingPort`] (broker session, subscribe, publish) and
//! [`EventSink`] (lifecycle events → JSON confirmations on
//! `<response_base>/<locker_id>`).
//!
//! Inbound messages never touch the adapter's state: the client callback
//! copies them into [`INBOUND_CHANNEL`](crate::rpc::channels::INBOUND_CHANNEL)
//! and the main loop hands them to the command engine.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`
//!   with a callback running on the MQTT task.
//! - **all other targets**: an in-memory broker that records publishes
//!   and accepts injected messages.
//!
//! ## Reconnection policy
//!
//! While disconnected, an attempt is made at most once per
//! `reconnect_interval_ms` (strictly more than the interval must have
//! elapsed, wrapping-safe). A successful session resubscribes to the
//! command topic and clears the attempt timer. Events emitted while
//! offline are dropped with a warning; they are not queued.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::config::SystemConfig;
use crate::error::{self, CommsError};
use crate::rpc::codec::{LockerResponse, response_topic};

use super::device_id::ClientIdString;

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
};

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

/// Publish/subscribe session with the broker.
pub trait MessagingPort {
    fn is_connected(&self) -> bool;

    /// Keep the session alive; call every loop iteration.
    fn poll(&mut self, now_ms: u32, network_up: bool);

    fn publish(&mut self, topic: &str, payload: &[u8]) -> error::Result<()>;
}

/// Set by the client callback; read by the main loop.
#[cfg(target_os = "espidf")]
static BROKER_CONNECTED: AtomicBool = AtomicBool::new(false);

/// Publish counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MqttStats {
    pub published: u32,
    pub dropped: u32,
    pub connect_attempts: u32,
}

// ───────────────────────────────────────────────────────────────
// MQTT adapter
// ───────────────────────────────────────────────────────────────

pub struct MqttAdapter {
    broker_url: String,
    client_id: ClientIdString,
    command_topic: String,
    response_topic_base: String,
    reconnect_interval_ms: u32,
    last_attempt_ms: Option<u32>,
    subscribed: bool,
    stats: MqttStats,
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimBroker,
}

/// Host stand-in for the broker.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug)]
struct SimBroker {
    reachable: bool,
    connected: bool,
    subscriptions: Vec<String>,
    published: Vec<(String, Vec<u8>)>,
}

impl MqttAdapter {
    pub fn new(cfg: &SystemConfig, client_id: ClientIdString) -> Self {
        Self {
            broker_url: cfg.broker_url(),
            client_id,
            command_topic: cfg.command_topic.clone(),
            response_topic_base: cfg.response_topic_base.clone(),
            reconnect_interval_ms: cfg.reconnect_interval_ms,
            last_attempt_ms: None,
            subscribed: false,
            stats: MqttStats::default(),
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(not(target_os = "espidf"))]
            sim: SimBroker {
                reachable: true,
                connected: false,
                subscriptions: Vec::new(),
                published: Vec::new(),
            },
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn stats(&self) -> MqttStats {
        self.stats
    }

    fn attempt_due(&self, now_ms: u32) -> bool {
        match self.last_attempt_ms {
            None => true,
            Some(last) => now_ms.wrapping_sub(last) > self.reconnect_interval_ms,
        }
    }

    fn on_session_up(&mut self) {
        match self.platform_subscribe() {
            Ok(()) => {
                self.subscribed = true;
                self.last_attempt_ms = None;
                info!(
                    "MQTT: connected as '{}', subscribed to '{}'",
                    self.client_id, self.command_topic
                );
            }
            Err(e) => warn!("MQTT: {}", e),
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), CommsError> {
        if self.client.is_some() {
            // The ESP-IDF client retries on its own at reconnect_timeout.
            return Ok(());
        }
        let conf = MqttClientConfiguration {
            client_id: Some(self.client_id.as_str()),
            keep_alive_interval: Some(core::time::Duration::from_secs(15)),
            reconnect_timeout: Some(core::time::Duration::from_millis(u64::from(
                self.reconnect_interval_ms,
            ))),
            ..Default::default()
        };
        let client = EspMqttClient::new_cb(&self.broker_url, &conf, |event| {
            match event.payload() {
                EventPayload::Connected(_) => BROKER_CONNECTED.store(true, Ordering::Release),
                EventPayload::Disconnected => BROKER_CONNECTED.store(false, Ordering::Release),
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    details: Details::Complete,
                    ..
                } => {
                    crate::rpc::channels::enqueue_inbound(topic, data);
                }
                EventPayload::Received { .. } => {
                    warn!("MQTT: fragmented message dropped");
                }
                EventPayload::Error(e) => warn!("MQTT: client error {:?}", e),
                _ => {}
            }
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {}", e);
            CommsError::MqttConnectFailed
        })?;
        self.client = Some(client);
        info!("MQTT: client started for {}", self.broker_url);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), CommsError> {
        if !self.sim.reachable {
            return Err(CommsError::MqttConnectFailed);
        }
        self.sim.connected = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.client.is_some() && BROKER_CONNECTED.load(Ordering::Acquire)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim.connected
    }

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(&mut self) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::MqttDisconnected)?;
        client
            .subscribe(&self.command_topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|_| CommsError::MqttSubscribeFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(&mut self) -> Result<(), CommsError> {
        if !self.sim.connected {
            return Err(CommsError::MqttSubscribeFailed);
        }
        if !self.sim.subscriptions.contains(&self.command_topic) {
            self.sim.subscriptions.push(self.command_topic.clone());
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::MqttDisconnected)?;
        client
            .enqueue(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|_| CommsError::MqttPublishFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        self.sim.published.push((topic.into(), payload.to_vec()));
        Ok(())
    }

    // ── Simulation controls ───────────────────────────────────

    /// Make the broker reachable or not; unreachable also drops the
    /// current session.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_reachable(&mut self, reachable: bool) {
        self.sim.reachable = reachable;
        if !reachable {
            self.sim.connected = false;
            self.sim.subscriptions.clear();
        }
    }

    /// Deliver a message as the broker would: only on a live session and
    /// a subscribed topic. Returns whether it was queued.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_inject(&self, topic: &str, payload: &[u8]) -> bool {
        self.sim.connected
            && self.sim.subscriptions.iter().any(|t| t == topic)
            && crate::rpc::channels::enqueue_inbound(topic, payload)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_published(&self) -> &[(String, Vec<u8>)] {
        &self.sim.published
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_subscriptions(&self) -> &[String] {
        &self.sim.subscriptions
    }
}

// ───────────────────────────────────────────────────────────────
// MessagingPort
// ───────────────────────────────────────────────────────────────

impl MessagingPort for MqttAdapter {
    fn is_connected(&self) -> bool {
        self.subscribed && self.platform_is_connected()
    }

    fn poll(&mut self, now_ms: u32, network_up: bool) {
        if self.platform_is_connected() {
            if !self.subscribed {
                self.on_session_up();
            }
            return;
        }

        if self.subscribed {
            warn!("MQTT: connection lost");
            self.subscribed = false;
        }
        if !network_up || !self.attempt_due(now_ms) {
            return;
        }

        self.last_attempt_ms = Some(now_ms);
        self.stats.connect_attempts = self.stats.connect_attempts.wrapping_add(1);
        info!("MQTT: connecting to {}", self.broker_url);
        match self.platform_connect() {
            Ok(()) if self.platform_is_connected() => self.on_session_up(),
            Ok(()) => {}
            Err(e) => warn!("MQTT: {}, retrying in {} ms", e, self.reconnect_interval_ms),
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> error::Result<()> {
        if !self.is_connected() {
            return Err(CommsError::MqttDisconnected.into());
        }
        self.platform_publish(topic, payload)?;
        self.stats.published = self.stats.published.wrapping_add(1);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// EventSink
// ───────────────────────────────────────────────────────────────

impl EventSink for MqttAdapter {
    fn emit(&mut self, event: &AppEvent) {
        let Some(resp) = LockerResponse::from_event(event) else {
            return;
        };
        let payload = match resp.to_json() {
            Ok(p) => p,
            Err(e) => {
                warn!("MQTT: encode failed: {}", e);
                return;
            }
        };
        let topic = response_topic(&self.response_topic_base, resp.locker_id);
        if let Err(e) = self.publish(&topic, &payload) {
            self.stats.dropped = self.stats.dropped.wrapping_add(1);
            warn!("MQTT: confirmation for '{}' dropped: {}", resp.locker_id, e);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::device_id::{client_id, read_mac};
    use crate::locker::{LockerConfirmation, LockerStatus, locker_id};

    fn adapter() -> MqttAdapter {
        MqttAdapter::new(&SystemConfig::default(), client_id(&read_mac()))
    }

    fn closed(id: &str, gpio: u8) -> AppEvent {
        AppEvent::LockerClosed(LockerConfirmation {
            locker_id: locker_id(id).unwrap(),
            channel: gpio,
            status: LockerStatus::Closed,
        })
    }

    #[test]
    fn first_poll_connects_and_subscribes() {
        let mut m = adapter();
        m.poll(0, true);
        assert!(m.is_connected());
        assert_eq!(m.sim_subscriptions(), ["locker/commands".to_string()]);
    }

    #[test]
    fn no_attempt_without_network() {
        let mut m = adapter();
        m.poll(0, false);
        assert!(!m.is_connected());
        assert_eq!(m.stats().connect_attempts, 0);
    }

    #[test]
    fn reconnect_waits_strictly_longer_than_interval() {
        let mut m = adapter();
        m.sim_set_reachable(false);
        m.poll(1_000, true);
        assert_eq!(m.stats().connect_attempts, 1);

        m.sim_set_reachable(true);
        m.poll(6_000, true);
        assert_eq!(m.stats().connect_attempts, 1);
        m.poll(6_001, true);
        assert_eq!(m.stats().connect_attempts, 2);
        assert!(m.is_connected());
    }

    #[test]
    fn lost_session_is_noticed_and_restored() {
        let mut m = adapter();
        m.poll(0, true);
        m.sim_set_reachable(false);
        m.poll(10, true);
        assert!(!m.is_connected());
        m.sim_set_reachable(true);
        m.poll(5_011, true);
        assert!(m.is_connected());
        assert_eq!(m.sim_subscriptions().len(), 1);
    }

    #[test]
    fn events_published_to_per_locker_topic() {
        let mut m = adapter();
        m.poll(0, true);
        m.emit(&closed("A1", 13));
        let (topic, payload) = &m.sim_published()[0];
        assert_eq!(topic, "locker/responses/A1");
        assert_eq!(
            core::str::from_utf8(payload).unwrap(),
            r#"{"success":true,"locker_id":"A1","status":"closed","gpio":13}"#
        );
        assert_eq!(m.stats().published, 1);
    }

    #[test]
    fn offline_publish_is_a_comms_error() {
        let mut m = adapter();
        assert_eq!(
            m.publish("locker/responses/A1", b"{}"),
            Err(error::Error::Comms(CommsError::MqttDisconnected))
        );
        assert_eq!(m.stats().published, 0);
    }

    #[test]
    fn offline_events_dropped() {
        let mut m = adapter();
        m.emit(&closed("A1", 13));
        assert!(m.sim_published().is_empty());
        assert_eq!(m.stats().dropped, 1);
    }

    #[test]
    fn started_event_not_published() {
        let mut m = adapter();
        m.poll(0, true);
        m.emit(&AppEvent::Started { open_duration_ms: 5_000 });
        assert!(m.sim_published().is_empty());
        assert_eq!(m.stats().dropped, 0);
    }
}
