//! System configuration parameters
//!
//! Build-time policy constants for the locker lifecycle, plus the
//! runtime [`SystemConfig`] that holds the messaging parameters.
//! Runtime values can be overridden via NVS (written by the
//! provisioning portal) and are validated before every save.

use serde::{Deserialize, Serialize};

// --- Build-time locker policy ---

/// How long a locker stays unlocked before the sweep re-locks it.
pub const LOCKER_OPEN_DURATION_MS: u32 = 5_000;

/// Maximum number of simultaneously open lockers.
pub const MAX_OPEN_LOCKERS: usize = 16;

/// Maximum locker id length in bytes (the id becomes a topic segment).
pub const LOCKER_ID_MAX_LEN: usize = 32;

/// Maximum MQTT host name length (matches the provisioning form field).
pub const MQTT_HOST_MAX_LEN: usize = 40;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- MQTT broker ---
    /// Broker host name or IP address
    pub mqtt_host: String,
    /// Broker TCP port
    pub mqtt_port: u16,
    /// Client id; empty means "derive from the factory MAC"
    pub mqtt_client_id: String,

    // --- Topics ---
    /// Topic the device subscribes to for locker commands
    pub command_topic: String,
    /// Base topic for responses; `/<locker_id>` is appended per event
    pub response_topic_base: String,

    // --- Timing ---
    /// Minimum gap between broker reconnect attempts (milliseconds)
    pub reconnect_interval_ms: u32,
    /// Main loop pause per iteration (milliseconds)
    pub loop_interval_ms: u32,

    // --- Provisioning ---
    /// SSID of the access point opened while waiting for WiFi credentials
    pub portal_ssid: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // MQTT broker
            mqtt_host: "n8n.nz03.com".into(),
            mqtt_port: 1883,
            mqtt_client_id: String::new(),

            // Topics
            command_topic: "locker/commands".into(),
            response_topic_base: "locker/responses".into(),

            // Timing
            reconnect_interval_ms: 5_000,
            loop_interval_ms: 10,

            // Provisioning
            portal_ssid: "ESP32_AP".into(),
        }
    }
}

impl SystemConfig {
    /// Broker URL in the form the ESP-IDF MQTT client expects.
    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.mqtt_host, self.mqtt_port)
    }
}
