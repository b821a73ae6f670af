//! Provisioning portal: a one-page HTTP form served on the open AP.
//!
//! The form collects the station SSID/password and, optionally, the
//! MQTT broker host and port. A valid submission is handed to the main
//! loop through [`PORTAL_SUBMISSION`]; the loop persists it and
//! restarts into station mode.
//!
//! Form parsing is plain Rust and runs on the host; only the HTTP
//! server itself is ESP-IDF specific.

use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::adapters::nvs::WifiCredentials;
use crate::adapters::wifi::{validate_password, validate_ssid};
use crate::config::SystemConfig;

/// Latest accepted form submission, consumed by the main loop.
pub static PORTAL_SUBMISSION: Signal<CriticalSectionRawMutex, PortalSubmission> = Signal::new();

const MAX_BODY_LEN: usize = 512;

/// A validated portal submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSubmission {
    pub credentials: WifiCredentials,
    /// `None` keeps the current broker host.
    pub mqtt_host: Option<String>,
    /// `None` keeps the current broker port.
    pub mqtt_port: Option<u16>,
}

impl PortalSubmission {
    /// Overlay the broker fields onto `cfg`.
    pub fn apply_to(&self, cfg: &mut SystemConfig) {
        if let Some(host) = &self.mqtt_host {
            cfg.mqtt_host.clone_from(host);
        }
        if let Some(port) = self.mqtt_port {
            cfg.mqtt_port = port;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormError {
    /// Bad percent-escape, non-UTF-8, or body too large.
    Malformed,
    MissingSsid,
    InvalidSsid,
    InvalidPassword,
    InvalidPort,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed form body"),
            Self::MissingSsid => write!(f, "SSID is required"),
            Self::InvalidSsid => write!(f, "SSID must be 1-32 printable characters"),
            Self::InvalidPassword => write!(f, "password must be empty or 8-64 characters"),
            Self::InvalidPort => write!(f, "MQTT port must be 1-65535"),
        }
    }
}

/// Parse an `application/x-www-form-urlencoded` body.
pub fn parse_form(body: &[u8]) -> Result<PortalSubmission, FormError> {
    if body.len() > MAX_BODY_LEN {
        return Err(FormError::Malformed);
    }
    let body = core::str::from_utf8(body).map_err(|_| FormError::Malformed)?;

    let mut ssid = None;
    let mut password = String::new();
    let mut mqtt_host = None;
    let mut mqtt_port = None;

    for pair in body.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = url_decode(value)?;
        match key {
            "ssid" => ssid = Some(value),
            "password" => password = value,
            "mqtt_host" => {
                let host = value.trim();
                if !host.is_empty() {
                    mqtt_host = Some(host.to_owned());
                }
            }
            "mqtt_port" => {
                let port = value.trim();
                if !port.is_empty() {
                    let port: u16 = port.parse().map_err(|_| FormError::InvalidPort)?;
                    if port == 0 {
                        return Err(FormError::InvalidPort);
                    }
                    mqtt_port = Some(port);
                }
            }
            _ => {}
        }
    }

    let ssid = ssid.filter(|s| !s.is_empty()).ok_or(FormError::MissingSsid)?;
    validate_ssid(&ssid).map_err(|_| FormError::InvalidSsid)?;
    validate_password(&password).map_err(|_| FormError::InvalidPassword)?;

    Ok(PortalSubmission {
        credentials: WifiCredentials {
            ssid: ssid.as_str().try_into().map_err(|()| FormError::InvalidSsid)?,
            password: password
                .as_str()
                .try_into()
                .map_err(|()| FormError::InvalidPassword)?,
        },
        mqtt_host,
        mqtt_port,
    })
}

fn url_decode(s: &str) -> Result<String, FormError> {
    let mut out = Vec::with_capacity(s.len());
    let mut bytes = s.bytes();
    while let Some(b) = bytes.next() {
        match b {
            b'+' => out.push(b' '),
            b'%' => {
                let hi = bytes.next().and_then(hex_val).ok_or(FormError::Malformed)?;
                let lo = bytes.next().and_then(hex_val).ok_or(FormError::Malformed)?;
                out.push((hi << 4) | lo);
            }
            _ => out.push(b),
        }
    }
    String::from_utf8(out).map_err(|_| FormError::Malformed)
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

pub const FORM_HTML: &str = r#"<!DOCTYPE html>
<html><head><meta name="viewport" content="width=device-width">
<title>Locker setup</title></head>
<body><h2>Locker setup</h2>
<form method="POST" action="/save">
<p>WiFi SSID<br><input name="ssid" maxlength="32" required></p>
<p>WiFi password<br><input name="password" type="password" maxlength="64"></p>
<p>MQTT server<br><input name="mqtt_host" maxlength="40" placeholder="n8n.nz03.com"></p>
<p>MQTT port<br><input name="mqtt_port" maxlength="6" placeholder="1883"></p>
<p><button type="submit">Save</button></p>
</form></body></html>"#;

pub const SAVED_HTML: &str = "<!DOCTYPE html><html><body><h2>Saved. Restarting…</h2></body></html>";

// ── ESP-IDF HTTP server ───────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use server::Portal;

#[cfg(target_os = "espidf")]
mod server {
    use esp_idf_svc::http::Method;
    use esp_idf_svc::http::server::{Configuration, EspHttpServer};
    use esp_idf_svc::io::{EspIOError, Read, Write};
    use esp_idf_svc::sys::EspError;
    use log::{info, warn};

    use super::{FORM_HTML, MAX_BODY_LEN, PORTAL_SUBMISSION, SAVED_HTML, parse_form};

    /// Running portal; dropping it stops the server.
    pub struct Portal {
        _server: EspHttpServer<'static>,
    }

    impl Portal {
        pub fn start() -> Result<Self, EspError> {
            let mut server = EspHttpServer::new(&Configuration::default())?;

            server.fn_handler::<EspIOError, _>("/", Method::Get, |req| {
                req.into_ok_response()?.write_all(FORM_HTML.as_bytes())
            })?;

            server.fn_handler::<EspIOError, _>("/save", Method::Post, |mut req| {
                let mut body = [0u8; MAX_BODY_LEN];
                let mut len = 0;
                while len < body.len() {
                    let n = req.read(&mut body[len..])?;
                    if n == 0 {
                        break;
                    }
                    len += n;
                }
                match parse_form(&body[..len]) {
                    Ok(sub) => {
                        info!("Portal: credentials received for '{}'", sub.credentials.ssid);
                        PORTAL_SUBMISSION.signal(sub);
                        req.into_ok_response()?.write_all(SAVED_HTML.as_bytes())
                    }
                    Err(e) => {
                        warn!("Portal: rejected submission: {}", e);
                        req.into_status_response(400)?
                            .write_all(format!("{e}").as_bytes())
                    }
                }
            })?;

            info!("Portal: HTTP server listening");
            Ok(Self { _server: server })
        }
    }
}
