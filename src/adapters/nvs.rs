//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] for the locker
//! firmware.
//!
//! # Layout
//!
//! | Namespace   | Key      | Contents                              |
//! |-------------|----------|---------------------------------------|
//! | `lockerbox` | `syscfg` | `postcard`-encoded [`SystemConfig`]   |
//! | `wifi`      | `creds`  | `postcard`-encoded [`WifiCredentials`]|
//!
//! Open-locker state is never written here; it resets on every boot.
//!
//! # Security
//!
//! - Config validation: every field is checked before persistence.
//! - Namespace isolation: WiFi credentials live in their own namespace
//!   so a config wipe and a credential wipe are independent.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::{MQTT_HOST_MAX_LEN, SystemConfig};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "lockerbox";
const CONFIG_KEY: &str = "syscfg";
const CRED_NAMESPACE: &str = "wifi";
const CRED_KEY: &str = "creds";

const MAX_BLOB_SIZE: usize = 1024;

/// Station credentials captured by the provisioning portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NVS: ESP-IDF partition initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NVS: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// NVS names are at most 15 bytes; copy into a NUL-terminated buffer.
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let bytes = name.as_bytes();
        let len = bytes.len().min(15);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = Self::c_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        // SAFETY: handle was opened above and is not used afterwards.
        unsafe {
            nvs_close(handle);
        }
        result
    }

    // ── WiFi credentials ──────────────────────────────────────

    pub fn store_wifi_credentials(&mut self, creds: &WifiCredentials) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(creds).map_err(|_| StorageError::IoError)?;
        self.write(CRED_NAMESPACE, CRED_KEY, &bytes)?;
        info!("NVS: WiFi credentials stored (SSID='{}')", creds.ssid);
        Ok(())
    }

    /// Stored credentials, or `None` if never provisioned or unreadable.
    pub fn load_wifi_credentials(&self) -> Option<WifiCredentials> {
        let mut buf = [0u8; 128];
        let len = match self.read(CRED_NAMESPACE, CRED_KEY, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => return None,
            Err(e) => {
                warn!("NVS: WiFi credentials unreadable ({})", e);
                return None;
            }
        };
        match postcard::from_bytes(&buf[..len]) {
            Ok(creds) => Some(creds),
            Err(_) => {
                warn!("NVS: WiFi credentials corrupted, ignoring");
                None
            }
        }
    }

    pub fn has_wifi_credentials(&self) -> bool {
        self.exists(CRED_NAMESPACE, CRED_KEY)
    }

    // ── Factory reset ─────────────────────────────────────────

    /// Wipe stored config and WiFi credentials.
    pub fn factory_reset(&mut self) -> Result<(), StorageError> {
        self.erase_namespace(CONFIG_NAMESPACE)?;
        self.erase_namespace(CRED_NAMESPACE)?;
        warn!("NVS: factory reset, config and credentials erased");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        let result = Self::with_nvs_handle(namespace, true, |handle| {
            // SAFETY: handle is open read-write for the closure's duration.
            let ret = unsafe { nvs_erase_all(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        match result {
            Ok(()) => Ok(()),
            // Namespace never created: nothing to erase.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(()),
            Err(_) => Err(StorageError::IoError),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        let prefix = format!("{}::", namespace);
        self.store.borrow_mut().retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }
}

/// Reject configs that would leave the device unable to reach its broker.
pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if cfg.mqtt_host.is_empty() || cfg.mqtt_host.len() > MQTT_HOST_MAX_LEN {
        return Err(ConfigError::ValidationFailed(
            "mqtt_host must be 1–40 bytes",
        ));
    }
    if !cfg
        .mqtt_host
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
    {
        return Err(ConfigError::ValidationFailed(
            "mqtt_host must be a host name or IPv4 address",
        ));
    }
    if cfg.mqtt_port == 0 {
        return Err(ConfigError::ValidationFailed("mqtt_port must be 1–65535"));
    }
    if cfg.mqtt_client_id.len() > 23 {
        return Err(ConfigError::ValidationFailed(
            "mqtt_client_id must be at most 23 bytes",
        ));
    }
    if !is_topic_name(&cfg.command_topic) {
        return Err(ConfigError::ValidationFailed(
            "command_topic must be a non-empty topic without wildcards",
        ));
    }
    if !is_topic_name(&cfg.response_topic_base) {
        return Err(ConfigError::ValidationFailed(
            "response_topic_base must be a non-empty topic without wildcards",
        ));
    }
    if cfg.command_topic == cfg.response_topic_base {
        return Err(ConfigError::ValidationFailed(
            "command_topic and response_topic_base must differ",
        ));
    }
    if !(1_000..=60_000).contains(&cfg.reconnect_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "reconnect_interval_ms must be 1000–60000",
        ));
    }
    if !(1..=100).contains(&cfg.loop_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "loop_interval_ms must be 1–100",
        ));
    }
    if cfg.portal_ssid.is_empty() || cfg.portal_ssid.len() > 32 {
        return Err(ConfigError::ValidationFailed(
            "portal_ssid must be 1–32 bytes",
        ));
    }
    Ok(())
}

fn is_topic_name(topic: &str) -> bool {
    !topic.is_empty() && topic.len() <= 48 && !topic.contains(['+', '#'])
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let len = match self.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => {
                info!("NVS: no stored config, using defaults");
                return Ok(SystemConfig::default());
            }
            Err(e) => {
                warn!("NVS: config read error ({}), using defaults", e);
                return Ok(SystemConfig::default());
            }
        };
        let cfg: SystemConfig =
            postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
        validate_config(&cfg)?;
        info!("NVS: loaded config ({} bytes)", len);
        Ok(cfg)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::ValidationFailed("config blob too large"));
        }

        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            self.store.borrow_mut().insert(key, bytes);
            info!("NVS: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(CONFIG_KEY);
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                // SAFETY: key is NUL-terminated; bytes outlives the call.
                let ret = unsafe {
                    nvs_set_blob(handle, key.as_ptr().cast(), bytes.as_ptr().cast(), bytes.len())
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NVS: config saved ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NVS: write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            match self.store.borrow().get(&composite) {
                Some(data) if data.len() > buf.len() => Err(StorageError::Full),
                Some(data) => {
                    buf[..data.len()].copy_from_slice(data);
                    Ok(data.len())
                }
                None => Err(StorageError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let mut size = buf.len();
                // SAFETY: buf is valid for `size` bytes; key is NUL-terminated.
                let ret = unsafe {
                    nvs_get_blob(handle, key.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(size),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
                Err(e) if e == ESP_ERR_NVS_INVALID_LENGTH => Err(StorageError::Full),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().insert(composite, data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                // SAFETY: key is NUL-terminated; data outlives the call.
                let ret = unsafe {
                    nvs_set_blob(handle, key.as_ptr().cast(), data.as_ptr().cast(), data.len())
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => Ok(()),
                Err(e) if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE => Err(StorageError::Full),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().remove(&composite);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                // SAFETY: key is NUL-terminated.
                let ret = unsafe { nvs_erase_key(handle, key.as_ptr().cast()) };
                if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => Ok(()),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(()),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow().contains_key(&composite)
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                // SAFETY: key is NUL-terminated; type out-pointer may be null.
                let ret =
                    unsafe { nvs_find_key(handle, key.as_ptr().cast(), core::ptr::null_mut()) };
                Ok(ret == ESP_OK)
            });
            result.unwrap_or(false)
        }
    }
}
