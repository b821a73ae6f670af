//! Lockerbox Firmware — Main Entry Point
//!
//! Hexagonal architecture driven by a single cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioActuator     LogEventSink   NvsAdapter    Esp32Time       │
//! │  (ActuatorPort)   (EventSink)    (Config+NVS)  (ClockPort)     │
//! │  WifiAdapter      MqttAdapter    Portal                        │
//! │  (Connectivity)   (Messaging+EventSink) (provisioning form)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          AppService → LockerController (pure logic)    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each iteration: WiFi poll → MQTT poll → drain inbound commands →
//! auto-close sweep → LED → reset button → portal → watchdog → sleep.
//! Commands and the sweep run on this one task, so they never race.
//! Nothing on this task may block longer than the watchdog timeout;
//! WiFi connects are started here and completed by later polls.
#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{error, info, warn};

use lockerbox::adapters::device_id;
use lockerbox::adapters::hardware::GpioActuator;
use lockerbox::adapters::log_sink::LogEventSink;
use lockerbox::adapters::mqtt::{MessagingPort, MqttAdapter};
use lockerbox::adapters::nvs::NvsAdapter;
use lockerbox::adapters::portal::{PORTAL_SUBMISSION, Portal};
use lockerbox::adapters::time::Esp32TimeAdapter;
use lockerbox::adapters::wifi::{ConnectivityPort, WifiAdapter};
use lockerbox::app::ports::{ClockPort, ConfigPort};
use lockerbox::app::service::AppService;
use lockerbox::config::{LOCKER_OPEN_DURATION_MS, SystemConfig};
use lockerbox::drivers::button::{ButtonEvent, ResetButton};
use lockerbox::drivers::hw_init;
use lockerbox::drivers::status_led::{LinkStatus, StatusLed};
use lockerbox::drivers::watchdog::Watchdog;
use lockerbox::pins;
use lockerbox::rpc::channels::try_take_inbound;
use lockerbox::rpc::engine::CommandEngine;

const STATUS_LOG_INTERVAL_MS: u32 = 60_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Lockerbox v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Board pins ─────────────────────────────────────────
    hw_init::init_peripherals().map_err(|e| anyhow!("HAL init failed: {e}"))?;

    // ── 3. Load config from NVS (or defaults) ─────────────────
    let mut nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {e}"))?;
    let config = nvs.load().unwrap_or_else(|e| {
        warn!("NVS config load failed ({}), using defaults", e);
        SystemConfig::default()
    });

    // ── 4. Device identity ────────────────────────────────────
    let mac = device_id::read_mac();
    let client_id = device_id::resolve_client_id(&config.mqtt_client_id, &mac);
    info!(
        "Device ID: {} (MQTT client '{}')",
        device_id::device_id(&mac),
        client_id
    );

    // ── 5. WiFi: station with stored credentials, else portal ─
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let driver = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs_partition))?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(driver, sysloop)?);
    wifi.set_portal_fallback(&config.portal_ssid)
        .map_err(|e| anyhow!("portal SSID invalid: {e}"))?;

    match nvs.load_wifi_credentials() {
        Some(creds) => {
            wifi.set_credentials(&creds.ssid, &creds.password)
                .map_err(|e| anyhow!("stored WiFi credentials invalid: {e}"))?;
            // Returns at once; the loop's polls finish the association.
            if let Err(e) = wifi.connect() {
                warn!("WiFi: initial connect failed ({}), will retry", e);
            }
        }
        None => {
            info!("WiFi: no credentials stored, opening provisioning portal");
            wifi.start_provisioning(&config.portal_ssid)
                .map_err(|e| anyhow!("provisioning AP failed: {e}"))?;
        }
    }

    // ── 6. Construct adapters + app service ───────────────────
    let clock = Esp32TimeAdapter::new();
    let mut hw = GpioActuator::new();
    let mut sinks = (LogEventSink::new(), MqttAdapter::new(&config, client_id));
    let mut engine = CommandEngine::new(&config.command_topic);
    let mut led = StatusLed::new(pins::LED_BUILTIN_GPIO);
    let mut button = ResetButton::new(pins::RESET_BUTTON_GPIO);

    let mut app = AppService::new(LOCKER_OPEN_DURATION_MS);
    app.start(&mut sinks);

    // ── 7. Watchdog, armed once boot is done ──────────────────
    let watchdog = Watchdog::default();

    info!("System ready. Entering main loop.");

    // ── 8. Main loop ──────────────────────────────────────────
    let mut last_status_ms = clock.now_ms();
    let mut portal: Option<Portal> = None;
    let mut portal_wanted = false;

    loop {
        let now = clock.now_ms();

        // Connectivity.
        wifi.poll(now);
        let wifi_up = wifi.is_connected();
        sinks.1.poll(now, wifi_up);

        // Inbound commands, then the auto-close sweep.
        while let Some(msg) = try_take_inbound() {
            engine.dispatch(&msg.topic, &msg.payload, &mut app, &clock, &mut hw, &mut sinks);
        }
        app.tick(&clock, &mut hw, &mut sinks);

        // Status LED.
        let link = LinkStatus::from_links(wifi.is_provisioning(), wifi_up, sinks.1.is_connected());
        led.update(link, now);

        // Factory reset: re-lock everything, wipe NVS, reboot.
        if button.poll(now) == Some(ButtonEvent::FactoryReset) {
            warn!("Button: factory reset");
            app.close_all(&mut hw, &mut sinks);
            if let Err(e) = nvs.factory_reset() {
                error!("Factory reset: NVS erase failed ({})", e);
            }
            hw_init::restart();
        }

        // Portal server follows the radio: up while provisioning (at boot
        // or after repeated connect failures), down once it leaves.
        if wifi.is_provisioning() != portal_wanted {
            portal_wanted = wifi.is_provisioning();
            if portal_wanted {
                match Portal::start() {
                    Ok(p) => portal = Some(p),
                    Err(e) => error!("Portal: HTTP server failed to start ({})", e),
                }
            } else if portal.take().is_some() {
                info!("Portal: closed");
            }
        }

        // Portal submission: persist, then reboot into station mode.
        if let Some(sub) = PORTAL_SUBMISSION.try_take() {
            if let Err(e) = nvs.store_wifi_credentials(&sub.credentials) {
                error!("Provisioning: storing credentials failed ({})", e);
            } else {
                let mut updated = config.clone();
                sub.apply_to(&mut updated);
                if let Err(e) = nvs.save(&updated) {
                    warn!("Provisioning: broker settings rejected ({}), keeping previous", e);
                }
                // Let the HTTP response flush before the radio goes down.
                FreeRtos::delay_ms(500);
                hw_init::restart();
            }
        }

        // Periodic status line.
        if now.wrapping_sub(last_status_ms) >= STATUS_LOG_INTERVAL_MS {
            last_status_ms = now;
            let s = app.stats();
            let e = engine.stats();
            let m = sinks.1.stats();
            info!(
                "STATUS | up={}s open={} opened={} closed={} rejected={} malformed={} | \
                 wifi={} rssi={:?} mqtt={} published={} dropped={}",
                clock.uptime_secs(),
                app.open_count(),
                s.opened,
                s.closed,
                s.rejected,
                e.malformed,
                wifi_up,
                wifi.rssi(),
                sinks.1.is_connected(),
                m.published,
                m.dropped,
            );
        }

        watchdog.feed();
        FreeRtos::delay_ms(config.loop_interval_ms);
    }
}
