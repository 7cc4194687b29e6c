//! Outbound broker payloads.
//!
//! Field names match what the back-end logger and rules engine parse.

use core::fmt::Write;
use core::net::Ipv4Addr;

use serde::Serialize;

/// `{prefix}/motion/state`
#[derive(Debug, Serialize)]
pub struct MotionMessage<'a> {
    pub device: &'a str,
    pub motion: bool,
    /// Uptime in milliseconds at the qualified edge.
    pub ts: u32,
}

/// `{prefix}/motion/health`, periodic.
#[derive(Debug, Serialize)]
pub struct HealthMessage<'a> {
    pub device: &'a str,
    pub uptime_ms: u32,
}

/// `{prefix}/motion/health`, retained, once per boot.
#[derive(Debug, Serialize)]
pub struct BootMessage<'a> {
    pub device: &'a str,
    pub boot: bool,
    /// Dotted-quad station address, `null` if unknown.
    pub ip: Option<heapless::String<16>>,
}

impl<'a> BootMessage<'a> {
    pub fn new(device: &'a str, ip: Option<Ipv4Addr>) -> Self {
        let ip = ip.map(|addr| {
            let mut s = heapless::String::new();
            let _ = write!(s, "{}", addr);
            s
        });
        Self { device, boot: true, ip }
    }
}

/// Serialize to a compact JSON payload.
pub fn encode<T: Serialize>(msg: &T) -> Option<Vec<u8>> {
    match serde_json::to_vec(msg) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("payload encode failed: {}", e);
            None
        }
    }
}
