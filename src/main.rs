//! PirNode firmware entry point
//!
//! Hexagonal architecture with a fixed-tick cooperative main loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioInput/Output  LogEventSink   Esp32Time      device_id     │
//! │  (embedded-hal)    (EventSink)    (Clock+Delay)  (eFuse MAC)   │
//! │  WifiAdapter       MqttAdapter                                 │
//! │  (NetworkPort)     (SessionPort)                               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              MotionNode (pure logic)                   │    │
//! │  │  PirDebouncer · MotionReporter · PrealertBlinker       │    │
//! │  │  SessionManager                                        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TickLoop (fixed tick, watchdog fed every pass)                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use pirnode::adapters::device_id;
use pirnode::adapters::hardware::{GpioInput, GpioOutput};
use pirnode::adapters::log_sink::LogEventSink;
use pirnode::adapters::mqtt::MqttAdapter;
use pirnode::adapters::time::Esp32TimeAdapter;
use pirnode::adapters::wifi::WifiAdapter;
use pirnode::app::ports::Clock;
use pirnode::app::service::MotionNode;
use pirnode::config::{IndicatorPolarity, NodeConfig};
use pirnode::drivers::{hw_init, watchdog};
use pirnode::scheduler::TickLoop;

/// Build-time override, e.g. `PIRNODE_CONFIG_JSON='{"wifi_ssid":"home",...}'`.
fn load_config() -> NodeConfig {
    let Some(json) = option_env!("PIRNODE_CONFIG_JSON") else {
        info!("Config: built-in defaults");
        return NodeConfig::default();
    };
    match NodeConfig::from_json(json.as_bytes()) {
        Ok(cfg) => {
            info!("Config: build-time override applied");
            cfg
        }
        Err(e) => {
            warn!("Config: override rejected ({}), using defaults", e);
            NodeConfig::default()
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PirNode v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config();
    let mac = device_id::read_mac();
    let dev_id = device_id::resolve(&config.device_id);
    info!("Device ID: {} (hostname: {})", dev_id, device_id::hostname(&mac));

    // ── 3. GPIO ───────────────────────────────────────────────
    if let Err(e) = hw_init::init_gpio(config.pir_pin, config.led_pin) {
        error!("GPIO init failed: {}, restarting", e);
        watchdog::restart();
    }
    // Indicator starts dark whatever its polarity.
    let led_dark_high = config.indicator_polarity == IndicatorPolarity::ActiveLow;
    let pir_pin = GpioInput::new(config.pir_pin);
    let led_pin = GpioOutput::new(config.led_pin, led_dark_high);

    // ── 4. Network adapters ───────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(esp_wifi, sysloop)?);
    if let Err(e) = wifi.set_credentials(&config.wifi_ssid, &config.wifi_password) {
        // Keep running: the node still samples and indicates, and the
        // association failures end in a restart.
        warn!("WiFi credentials rejected: {}", e);
    }

    // ── 5. Node ───────────────────────────────────────────────
    let clock = Esp32TimeAdapter::new();
    let mut delay = Esp32TimeAdapter::new();
    let mut sink = LogEventSink::new();
    let mut node = MotionNode::new(&config, &dev_id, pir_pin, led_pin, wifi, MqttAdapter::new(), clock.now_ms());

    if let Err(e) = node.boot(&clock, &mut delay, &mut sink) {
        error!("Boot failed: {}", e);
        watchdog::restart();
    }

    // Subscribed only now: the blocking boot connect is bounded by
    // `wifi_max_attempts`, not by the watchdog.
    let wdt = watchdog::Watchdog::new(config.watchdog_timeout_ms);

    info!("System ready. Entering main loop.");

    // ── 6. Main loop ──────────────────────────────────────────
    let mut tick_loop = TickLoop::new(config.tick_interval_ms);
    let fatal = tick_loop.run(&clock, &mut delay, || wdt.feed(), |now| node.tick(now, &mut sink));

    let stats = tick_loop.stats();
    error!(
        "Main loop stopped: {} (ticks={}, overruns={}, worst={} ms)",
        fatal, stats.ticks, stats.overruns, stats.worst_tick_ms
    );
    watchdog::restart();
}
