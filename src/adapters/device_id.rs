//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable device ID `LK-XXYYZZ` (last 3 bytes of the 6-byte
//! MAC in uppercase hex). It is:
//! - Deterministic across reboots (factory-burned eFuse MAC)
//! - The basis of the MQTT client id (`locker-xxyyzz`) when none is
//!   configured, so two boards on one broker never evict each other

use core::fmt::Write;

/// Fixed-size device ID string: "LK-XXYYZZ".
pub type DeviceIdString = heapless::String<16>;

/// MQTT client id; 23 bytes is the MQTT 3.1.1 guaranteed maximum.
pub type ClientIdString = heapless::String<23>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: writes exactly 6 bytes into `mac`.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Derive the short device ID from the last 3 MAC bytes.
/// Format: `LK-XXYYZZ` (e.g., `LK-EFCAFE`).
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    let _ = write!(id, "LK-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// Derive the MQTT client id. Format: `locker-xxyyzz`.
pub fn client_id(mac: &MacAddress) -> ClientIdString {
    let mut name = ClientIdString::new();
    let _ = write!(name, "locker-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}

/// The configured client id, or the MAC-derived one when unset.
pub fn resolve_client_id(configured: &str, mac: &MacAddress) -> ClientIdString {
    if configured.is_empty() {
        return client_id(mac);
    }
    let mut id = ClientIdString::new();
    match id.push_str(configured) {
        Ok(()) => id,
        Err(()) => client_id(mac),
    }
}
