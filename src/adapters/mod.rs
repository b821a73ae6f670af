//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to               |
//! |-------------|--------------------|---------------------------|
//! | `hardware`  | ActuatorPort       | ESP32 GPIO                |
//! | `log_sink`  | EventSink          | Serial log output         |
//! | `mqtt`      | MessagingPort      | ESP-IDF MQTT client       |
//! |             | EventSink          | Per-locker response topics|
//! | `nvs`       | ConfigPort         | NVS / in-memory store     |
//! |             | StoragePort        |                           |
//! | `portal`    | —                  | ESP-IDF HTTP server       |
//! | `time`      | ClockPort          | ESP32 system timer        |
//! | `wifi`      | ConnectivityPort   | ESP-IDF WiFi STA / AP     |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod portal;
pub mod time;
pub(crate) mod utils;
pub mod wifi;
