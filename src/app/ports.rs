//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MotionNode (domain)
//! ```
//!
//! Pins are not listed here: the PIR input and indicator output use the
//! `embedded-hal` 1.0 digital traits directly, so any HAL pin driver (or a
//! test double) plugs in unchanged.

use core::fmt;
use core::net::Ipv4Addr;

use crate::error::Result;

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond counter since boot.
///
/// Wraps at `u32::MAX` (~49.7 days); every consumer computes durations
/// with `wrapping_sub`.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Network transport (driven adapter: Wi-Fi STA)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

/// Transport-layer connection to the network.
pub trait NetworkPort {
    /// One association attempt. Bounded in time by the implementation.
    fn connect(&mut self) -> core::result::Result<(), NetworkError>;

    fn is_connected(&self) -> bool;

    /// Station address, once associated.
    fn local_ip(&self) -> Option<Ipv4Addr>;
}

// ───────────────────────────────────────────────────────────────
// Publish/subscribe session (driven adapter: MQTT client)
// ───────────────────────────────────────────────────────────────

/// Static credentials for a session connect.
#[derive(Debug, Clone, Copy)]
pub struct SessionCredentials<'a> {
    pub host: &'a str,
    pub port: u16,
    pub client_id: &'a str,
    /// `None` = anonymous connect.
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub keepalive_secs: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// Connect refused or timed out. The code is the client's state value
    /// (negative for transport-level failures, positive for CONNACK codes).
    ConnectFailed(i32),
    NotConnected,
    PublishFailed,
    SubscribeFailed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed(rc) => write!(f, "connect failed rc={}", rc),
            Self::NotConnected => write!(f, "not connected"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
        }
    }
}

/// Publish/subscribe client session.
pub trait SessionPort {
    /// Connect with credentials. Bounded in time by the implementation.
    fn connect(&mut self, creds: &SessionCredentials<'_>) -> core::result::Result<(), SessionError>;

    fn is_connected(&self) -> bool;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> core::result::Result<(), SessionError>;

    fn subscribe(&mut self, topic: &str) -> core::result::Result<(), SessionError>;

    /// Non-blocking service tick: process pending I/O and hand every
    /// received message to `deliver`.
    fn service(&mut self, deliver: &mut dyn FnMut(&str, &[u8]));
}

// ───────────────────────────────────────────────────────────────
// Publisher (domain → session manager)
// ───────────────────────────────────────────────────────────────

/// The narrow slice of the session manager the reporter needs.
pub trait Publisher {
    fn is_connected(&self) -> bool;

    /// Returns `false` when nothing was sent. Never fails into the caller.
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Command handler (session manager → domain)
// ───────────────────────────────────────────────────────────────

/// Inbound command channels, one per declared subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Prealert,
}

/// Receives messages routed by topic from the session manager.
pub trait CommandHandler {
    fn handle(&mut self, kind: CommandKind, payload: &[u8]) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
