//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production). One
//! line per event, `TAG | key=value`.

use log::{debug, error, info, warn};

use crate::app::events::{AppEvent, PrealertEnd};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Booted { ip } => match ip {
                Some(ip) => info!("BOOT  | announced | ip={}", ip),
                None => info!("BOOT  | announced | ip=unknown"),
            },
            AppEvent::WarmingUp { remaining_ms } => {
                info!("PIR   | warmup... | remaining={}s", remaining_ms.div_ceil(1000));
            }
            AppEvent::MotionChanged { motion, at_ms, published } => {
                info!(
                    "PIR   | motion={} | ts={} | {}",
                    motion,
                    at_ms,
                    if *published { "published" } else { "offline" }
                );
            }
            AppEvent::RisingSuppressed { at_ms } => {
                debug!("PIR   | HIGH ignored (waiting stable LOW) | ts={}", at_ms);
            }
            AppEvent::Heartbeat { uptime_ms } => {
                debug!("HLTH  | uptime_ms={}", uptime_ms);
            }
            AppEvent::SessionEstablished { reconnects } => {
                info!("MQTT  | connected | reconnects={}", reconnects);
            }
            AppEvent::ReconnectFailed(e) => {
                warn!("MQTT  | {} | retrying", e);
            }
            AppEvent::Fatal(e) => {
                error!("FATAL | {}", e);
            }
            AppEvent::PrealertStarted { duration_ms } => {
                info!("ALERT | prealert start | duration={}s", duration_ms / 1000);
            }
            AppEvent::PrealertEnded(end) => {
                let why = match end {
                    PrealertEnd::Stopped => "stopped",
                    PrealertEnd::TimedOut => "timed out",
                };
                info!("ALERT | prealert {}", why);
            }
            AppEvent::CommandIgnored(r) => {
                debug!("CMD   | ignored | {}", r);
            }
        }
    }
}
