//! Node configuration parameters
//!
//! All tunable parameters for the PirNode system. Defaults mirror the
//! constants of the deployed eldercare sensors; a JSON document may override
//! any subset of fields (missing fields keep their default).

use core::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::pins;

pub type ShortString = heapless::String<32>;
pub type SecretString = heapless::String<64>;
pub type HostString = heapless::String<64>;
pub type TopicString = heapless::String<96>;

/// Physical wiring of the indicator LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorPolarity {
    /// Pin HIGH lights the LED.
    ActiveHigh,
    /// Pin LOW lights the LED (ESP8266/ESP32 on-board LEDs).
    ActiveLow,
}

/// What the indicator shows between heartbeat pulses and pre-alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionIndicator {
    /// Indicator untouched by motion edges.
    Disabled,
    /// Lit while motion is present (pin driven LOW on motion with an
    /// active-low LED, matching the deployed sensors).
    LitDuringMotion,
    /// Lit while no motion is present.
    LitWhileIdle,
}

/// Core node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Wi-Fi ---
    pub wifi_ssid: ShortString,
    pub wifi_password: SecretString,
    /// Consecutive association failures before the device restarts.
    pub wifi_max_attempts: u32,

    // --- MQTT broker ---
    pub broker_host: HostString,
    pub broker_port: u16,
    /// Empty = connect without credentials.
    pub mqtt_username: ShortString,
    pub mqtt_password: SecretString,
    /// MQTT client identifier; must be unique on the broker.
    /// Empty = derive from the factory MAC.
    pub device_id: ShortString,
    /// Prefix for all topics, e.g. `iot/eldercare/room1`.
    pub topic_prefix: heapless::String<64>,
    /// Fixed delay between session connect attempts (milliseconds)
    pub reconnect_delay_ms: u32,
    pub keepalive_secs: u16,

    // --- PIR ---
    pub pir_pin: i32,
    /// Ignore the sensor entirely for this long after boot (milliseconds)
    pub warmup_ms: u32,
    /// Minimum spacing between accepted transitions (milliseconds)
    pub edge_debounce_ms: u32,
    /// Continuous LOW required before a new HIGH counts (milliseconds)
    pub need_low_ms: u32,

    // --- Indicator ---
    pub led_pin: i32,
    pub indicator_polarity: IndicatorPolarity,
    pub motion_indicator: MotionIndicator,
    pub heartbeat_blink_ms: u32,

    // --- Pre-alert ---
    pub prealert_duration_ms: u32,
    pub blink_period_ms: u32,
    /// Use `ttl_sec` from the start command instead of the fixed duration.
    pub prealert_honor_ttl: bool,

    // --- Timing ---
    pub heartbeat_interval_ms: u32,
    /// Main loop tick (milliseconds)
    pub tick_interval_ms: u32,
    pub watchdog_timeout_ms: u32,
}

fn short<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    let _ = out.push_str(s);
    out
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Wi-Fi
            wifi_ssid: ShortString::new(),
            wifi_password: SecretString::new(),
            wifi_max_attempts: 30,

            // MQTT
            broker_host: short("192.168.0.48"),
            broker_port: 1883,
            mqtt_username: short("iot"),
            mqtt_password: short("iot"),
            device_id: ShortString::new(),
            topic_prefix: short("iot/eldercare/room1"),
            reconnect_delay_ms: 2000,
            keepalive_secs: 15,

            // PIR
            pir_pin: pins::PIR_GPIO,
            warmup_ms: 30_000,
            edge_debounce_ms: 2000,
            need_low_ms: 3000,

            // Indicator
            led_pin: pins::STATUS_LED_GPIO,
            indicator_polarity: IndicatorPolarity::ActiveLow,
            motion_indicator: MotionIndicator::LitDuringMotion,
            heartbeat_blink_ms: 80,

            // Pre-alert
            prealert_duration_ms: 300_000,
            blink_period_ms: 400,
            prealert_honor_ttl: false,

            // Timing
            heartbeat_interval_ms: 5000,
            tick_interval_ms: 50,
            watchdog_timeout_ms: 10_000,
        }
    }
}

/// Errors from loading or validating a [`NodeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// JSON could not be parsed (or a string exceeded its capacity).
    Corrupted,
    /// A field failed range validation.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl NodeConfig {
    /// Parse a (partial) JSON document over the defaults and validate it.
    pub fn from_json(json: &[u8]) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_slice(json).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range checks. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker_host.is_empty() {
            return Err(ConfigError::ValidationFailed("broker_host is empty"));
        }
        if self.broker_port == 0 {
            return Err(ConfigError::ValidationFailed("broker_port is 0"));
        }
        if self.topic_prefix.is_empty() || self.topic_prefix.ends_with('/') {
            return Err(ConfigError::ValidationFailed("topic_prefix empty or ends with '/'"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms is 0"));
        }
        // The tick must stay a small fraction of the debounce window or
        // edge timing drifts by whole ticks.
        if self.tick_interval_ms.saturating_mul(4) > self.edge_debounce_ms {
            return Err(ConfigError::ValidationFailed("tick_interval_ms > edge_debounce_ms / 4"));
        }
        if self.blink_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("blink_period_ms is 0"));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("heartbeat_interval_ms is 0"));
        }
        if self.heartbeat_blink_ms >= self.heartbeat_interval_ms {
            return Err(ConfigError::ValidationFailed("heartbeat_blink_ms >= heartbeat_interval_ms"));
        }
        if self.wifi_max_attempts == 0 {
            return Err(ConfigError::ValidationFailed("wifi_max_attempts is 0"));
        }
        if !pins::is_valid_gpio(self.pir_pin) {
            return Err(ConfigError::ValidationFailed("pir_pin outside GPIO0..=GPIO48"));
        }
        if !pins::is_valid_gpio(self.led_pin) {
            return Err(ConfigError::ValidationFailed("led_pin outside GPIO0..=GPIO48"));
        }
        if self.pir_pin == self.led_pin {
            return Err(ConfigError::ValidationFailed("pir_pin and led_pin collide"));
        }
        Ok(())
    }

    /// Topic set derived from `topic_prefix`.
    pub fn topics(&self) -> Topics {
        Topics {
            health: join(&self.topic_prefix, "motion/health"),
            state: join(&self.topic_prefix, "motion/state"),
            prealert_cmd: join(&self.topic_prefix, "cmd/prealert"),
        }
    }
}

fn join(prefix: &str, leaf: &str) -> TopicString {
    let mut t = TopicString::new();
    let _ = write!(t, "{}/{}", prefix, leaf);
    t
}

/// Fully-qualified topics for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Heartbeats and the retained boot announcement.
    pub health: TopicString,
    /// Motion transitions.
    pub state: TopicString,
    /// Inbound pre-alert commands (subscribed).
    pub prealert_cmd: TopicString,
}
