//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`], the hexagonal boundary for network
//! connectivity, including the provisioning fallback: with no stored
//! credentials the radio comes up as an open access point and the
//! portal (`adapters::portal`) collects an SSID and password.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! Nothing here blocks. `connect()` only hands the request to the driver;
//! `poll()` watches for the link on later ticks and gives an attempt
//! [`CONNECT_ATTEMPT_TIMEOUT_MS`] before counting it as failed. Between
//! failures the adapter waits an exponential backoff (2 s → 4 s → 8 s …
//! capped at 60 s).
//!
//! After [`PORTAL_FALLBACK_ATTEMPTS`] consecutive failures the adapter
//! reopens the provisioning AP (see [`WifiAdapter::set_portal_fallback`]).
//! Stored credentials get another try once the portal has been up for
//! [`PORTAL_WINDOW_MS`] without a submission.

use core::fmt;
use log::{error, info, warn};

use super::utils::is_printable_ascii;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration, Configuration,
    EspWifi,
};

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    AlreadyConnected,
    AccessPointFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(
                f,
                "password invalid (must be 8-64 bytes for WPA2, or empty for open)"
            ),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::AlreadyConnected => write!(f, "already connected to AP"),
            Self::AccessPointFailed => write!(f, "provisioning access point failed to start"),
        }
    }
}

pub trait ConnectivityPort {
    /// Start a connect attempt; completion is observed by `poll`.
    fn connect(&mut self) -> Result<(), ConnectivityError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    /// Drive connects, reconnects and the portal fallback; call every
    /// loop iteration.
    fn poll(&mut self, now_ms: u32);
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
    fn rssi(&self) -> Option<i8>;
    /// Bring up the open provisioning access point.
    fn start_provisioning(&mut self, ap_ssid: &str) -> Result<(), ConnectivityError>;
    fn is_provisioning(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    /// Attempt handed to the driver, link not up yet.
    Connecting,
    Connected,
    /// Waiting out the backoff; `attempt` counts consecutive failures.
    Reconnecting { attempt: u32 },
    Provisioning,
}

const INITIAL_BACKOFF_MS: u32 = 2_000;
const MAX_BACKOFF_MS: u32 = 60_000;

/// How long one association may take before it counts as failed.
pub const CONNECT_ATTEMPT_TIMEOUT_MS: u32 = 15_000;
/// Consecutive failed attempts before the portal AP is reopened.
pub const PORTAL_FALLBACK_ATTEMPTS: u32 = 5;
/// How long a fallback portal stays up before stored credentials are
/// retried.
pub const PORTAL_WINDOW_MS: u32 = 180_000;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

pub fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_ms: u32,
    failures: u32,
    /// Start of the backoff wait, or of the portal window while provisioning.
    last_attempt_ms: Option<u32>,
    attempt_started_ms: Option<u32>,
    /// AP name reopened after repeated failures; empty disables the fallback.
    fallback_ap: heapless::String<32>,
    last_rssi: Option<i8>,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimRadio,
}

/// Host stand-in for the radio; tests steer it to exercise reconnects.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimRadio {
    link_up: bool,
    /// Attempts the driver refuses outright.
    fail_remaining: u32,
    /// Attempts the driver accepts that never associate.
    stall_remaining: u32,
    connect_attempts: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_ms: INITIAL_BACKOFF_MS,
            failures: 0,
            last_attempt_ms: None,
            attempt_started_ms: None,
            fallback_ap: heapless::String::new(),
            last_rssi: None,
            wifi,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_ms: INITIAL_BACKOFF_MS,
            failures: 0,
            last_attempt_ms: None,
            attempt_started_ms: None,
            fallback_ap: heapless::String::new(),
            last_rssi: None,
            sim: SimRadio::default(),
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn backoff_ms(&self) -> u32 {
        self.backoff_ms
    }

    /// Reopen the provisioning AP `ap_ssid` after
    /// [`PORTAL_FALLBACK_ATTEMPTS`] consecutive failed attempts.
    pub fn set_portal_fallback(&mut self, ap_ssid: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ap_ssid)?;
        self.fallback_ap.clear();
        self.fallback_ap
            .push_str(ap_ssid)
            .map_err(|()| ConnectivityError::InvalidSsid)
    }

    fn on_connected(&mut self) {
        self.state = WifiState::Connected;
        self.backoff_ms = INITIAL_BACKOFF_MS;
        self.failures = 0;
        self.last_attempt_ms = None;
        self.attempt_started_ms = None;
        self.last_rssi = self.platform_rssi();
    }

    /// Hand an attempt to the driver. `now_ms` is `None` when the caller
    /// has no clock; the first `poll` then stamps the attempt.
    fn begin_attempt(&mut self, now_ms: Option<u32>) -> Result<(), ConnectivityError> {
        match self.platform_begin_connect() {
            Ok(()) => {
                self.state = WifiState::Connecting;
                self.attempt_started_ms = now_ms;
                Ok(())
            }
            Err(e) => {
                self.attempt_failed(now_ms);
                Err(e)
            }
        }
    }

    fn attempt_failed(&mut self, now_ms: Option<u32>) {
        self.failures = self.failures.saturating_add(1);
        self.attempt_started_ms = None;
        if self.failures > 1 {
            self.backoff_ms = self.backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
        }

        if self.failures >= PORTAL_FALLBACK_ATTEMPTS && !self.fallback_ap.is_empty() {
            warn!(
                "WiFi: '{}' unreachable after {} attempts, reopening portal",
                self.ssid, self.failures
            );
            let ap = self.fallback_ap.clone();
            match self.start_provisioning(&ap) {
                Ok(()) => {
                    self.last_attempt_ms = now_ms;
                    return;
                }
                Err(e) => error!("WiFi: fallback portal failed: {}", e),
            }
        }

        self.state = WifiState::Reconnecting {
            attempt: self.failures,
        };
        self.last_attempt_ms = now_ms;
    }

    fn poll_connecting(&mut self, now_ms: u32) {
        if self.platform_is_connected() {
            self.on_connected();
            info!("WiFi: connected (RSSI={:?})", self.last_rssi);
            return;
        }
        let Some(started) = self.attempt_started_ms else {
            self.attempt_started_ms = Some(now_ms);
            return;
        };
        if now_ms.wrapping_sub(started) > CONNECT_ATTEMPT_TIMEOUT_MS {
            warn!(
                "WiFi: no link to '{}' after {} ms",
                self.ssid, CONNECT_ATTEMPT_TIMEOUT_MS
            );
            self.platform_disconnect();
            self.attempt_failed(Some(now_ms));
        }
    }

    fn poll_reconnecting(&mut self, now_ms: u32) {
        let Some(last) = self.last_attempt_ms else {
            // Start the backoff window from the first poll.
            self.last_attempt_ms = Some(now_ms);
            return;
        };
        if now_ms.wrapping_sub(last) < self.backoff_ms {
            return;
        }
        info!(
            "WiFi: reconnect attempt {} (backoff {} ms)",
            self.failures + 1,
            self.backoff_ms
        );
        if let Err(e) = self.begin_attempt(Some(now_ms)) {
            warn!("WiFi: reconnect refused: {}", e);
        }
    }

    fn poll_provisioning(&mut self, now_ms: u32) {
        // Without stored credentials only a portal submission gets us out.
        if self.ssid.is_empty() {
            return;
        }
        let Some(opened) = self.last_attempt_ms else {
            self.last_attempt_ms = Some(now_ms);
            return;
        };
        if now_ms.wrapping_sub(opened) < PORTAL_WINDOW_MS {
            return;
        }
        info!("WiFi: portal idle, retrying '{}'", self.ssid);
        self.platform_stop_ap();
        self.failures = 0;
        self.backoff_ms = INITIAL_BACKOFF_MS;
        if let Err(e) = self.begin_attempt(Some(now_ms)) {
            warn!("WiFi: reconnect refused: {}", e);
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    /// Non-blocking: queues the association and returns.
    #[cfg(target_os = "espidf")]
    fn platform_begin_connect(&mut self) -> Result<(), ConnectivityError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let cfg = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        let fail = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi: driver error {}", e);
            ConnectivityError::ConnectionFailed
        };
        // The driver-level calls return at once; BlockingWifi's would
        // wait for the link and starve the task watchdog.
        let driver = self.wifi.wifi_mut();
        driver.set_configuration(&cfg).map_err(fail)?;
        if !driver.is_started().unwrap_or(false) {
            driver.start().map_err(fail)?;
        }
        driver.connect().map_err(fail)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin_connect(&mut self) -> Result<(), ConnectivityError> {
        self.sim.connect_attempts = self.sim.connect_attempts.wrapping_add(1);
        if self.sim.fail_remaining > 0 {
            self.sim.fail_remaining -= 1;
            warn!(
                "WiFi(sim): simulated failure (attempt {})",
                self.sim.connect_attempts
            );
            return Err(ConnectivityError::ConnectionFailed);
        }
        if self.sim.stall_remaining > 0 {
            self.sim.stall_remaining -= 1;
            info!(
                "WiFi(sim): attempt {} will never associate",
                self.sim.connect_attempts
            );
            return Ok(());
        }
        self.sim.link_up = true;
        info!(
            "WiFi(sim): associating with '{}' (attempt {})",
            self.ssid, self.sim.connect_attempts
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_start_ap(&mut self, ap_ssid: &str) -> Result<(), ConnectivityError> {
        let cfg = Configuration::AccessPoint(AccessPointConfiguration {
            ssid: ap_ssid
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            auth_method: AuthMethod::None,
            channel: 1,
            ..Default::default()
        });
        let fail = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi: AP driver error {}", e);
            ConnectivityError::AccessPointFailed
        };
        let driver = self.wifi.wifi_mut();
        if driver.is_started().unwrap_or(false) {
            driver.stop().map_err(fail)?;
        }
        driver.set_configuration(&cfg).map_err(fail)?;
        driver.start().map_err(fail)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_ap(&mut self, ap_ssid: &str) -> Result<(), ConnectivityError> {
        self.sim.link_up = false;
        info!("WiFi(sim): access point '{}' up", ap_ssid);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop_ap(&mut self) {
        if let Err(e) = self.wifi.wifi_mut().stop() {
            warn!("WiFi: AP stop error {}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop_ap(&mut self) {
        info!("WiFi(sim): access point down");
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Err(e) = self.wifi.wifi_mut().disconnect() {
            warn!("WiFi: disconnect error {}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        self.sim.link_up = false;
    }

    /// Associated and holding an IP.
    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        let driver = self.wifi.wifi();
        driver.is_connected().unwrap_or(false) && driver.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim.link_up
    }

    #[cfg(target_os = "espidf")]
    fn platform_rssi(&self) -> Option<i8> {
        let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
        // SAFETY: writes into the stack record; valid while associated.
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
        (ret == esp_idf_svc::sys::ESP_OK).then_some(ap_info.rssi)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_rssi(&self) -> Option<i8> {
        self.sim.link_up.then_some(-60)
    }

    // ── Simulation controls ───────────────────────────────────

    /// Make the driver refuse the next `n` connect attempts.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim.fail_remaining = n;
    }

    /// Let the next `n` attempts start but never associate.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_stall_next(&mut self, n: u32) {
        self.sim.stall_remaining = n;
    }

    /// Drop the link as if the AP went away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim.link_up = false;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_connect_attempts(&self) -> u32 {
        self.sim.connect_attempts
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        if self.state == WifiState::Connected {
            return Err(ConnectivityError::AlreadyConnected);
        }

        info!("WiFi: connecting to '{}'", self.ssid);
        self.begin_attempt(None).inspect_err(|e| {
            error!("WiFi: connection failed: {}", e);
        })
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        self.attempt_started_ms = None;
        self.last_rssi = None;
        info!("WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.state == WifiState::Connected && self.platform_is_connected()
    }

    fn poll(&mut self, now_ms: u32) {
        match self.state {
            WifiState::Connecting => self.poll_connecting(now_ms),
            WifiState::Reconnecting { .. } => self.poll_reconnecting(now_ms),
            WifiState::Provisioning => self.poll_provisioning(now_ms),
            WifiState::Connected => {
                if self.platform_is_connected() {
                    self.last_rssi = self.platform_rssi();
                } else {
                    warn!("WiFi: connection lost, entering reconnect");
                    self.state = WifiState::Reconnecting { attempt: 0 };
                    self.last_attempt_ms = Some(now_ms);
                    self.last_rssi = None;
                }
            }
            WifiState::Disconnected => {}
        }
    }

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid
            .push_str(ssid)
            .map_err(|()| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|()| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    fn rssi(&self) -> Option<i8> {
        self.last_rssi
    }

    fn start_provisioning(&mut self, ap_ssid: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ap_ssid)?;
        self.platform_start_ap(ap_ssid)?;
        self.state = WifiState::Provisioning;
        self.attempt_started_ms = None;
        self.last_attempt_ms = None;
        self.last_rssi = None;
        info!("WiFi: provisioning portal on open AP '{}'", ap_ssid);
        Ok(())
    }

    fn is_provisioning(&self) -> bool {
        self.state == WifiState::Provisioning
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
