//! GPIO pin assignments for the PirNode board.
//!
//! These are the defaults baked into [`NodeConfig`](crate::config::NodeConfig);
//! a JSON config override may move either pin.

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// HC-SR501 / AM312 PIR module output. Push-pull, no pull-up needed.
/// HIGH = motion detected.
pub const PIR_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// Indicator
// ---------------------------------------------------------------------------

/// On-board status LED, wired active-low (pin LOW = lit).
pub const STATUS_LED_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// Highest pad number on the ESP32-S3.
pub const MAX_GPIO: i32 = 48;

/// `pin` names a pad that exists on the SoC.
pub const fn is_valid_gpio(pin: i32) -> bool {
    pin >= 0 && pin <= MAX_GPIO
}
