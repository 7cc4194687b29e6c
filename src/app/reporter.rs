//! Motion reporting: debouncer results to broker messages and LED state.
//!
//! The reporter owns the heartbeat timer, the warmup-note timer and the
//! logical motion state. It never talks to the transport directly: every
//! message goes through a [`Publisher`], which drops it while offline.

use embedded_hal::digital::StatefulOutputPin;
use log::info;

use crate::config::{MotionIndicator, NodeConfig, ShortString, Topics};
use crate::drivers::indicator::Indicator;
use crate::sensors::pir::PirSample;

use super::events::AppEvent;
use super::messages::{encode, BootMessage, HealthMessage, MotionMessage};
use super::ports::{EventSink, Publisher};

/// Minimum spacing of warmup progress notes.
pub const WARMUP_NOTE_INTERVAL_MS: u32 = 5000;

pub struct MotionReporter {
    device: ShortString,
    topics: Topics,
    motion_indicator: MotionIndicator,
    heartbeat_interval_ms: u32,
    heartbeat_blink_ms: u32,

    motion: bool,
    last_heartbeat_ms: u32,
    /// Set while the heartbeat liveness blink is lit.
    pulse_since_ms: Option<u32>,
    last_warmup_note_ms: Option<u32>,
    boot_announced: bool,
    heartbeats: u32,
}

impl MotionReporter {
    /// `now` starts the first heartbeat period.
    pub fn new(cfg: &NodeConfig, device: &str, now: u32) -> Self {
        let mut id = ShortString::new();
        let _ = id.push_str(device);
        Self {
            device: id,
            topics: cfg.topics(),
            motion_indicator: cfg.motion_indicator,
            heartbeat_interval_ms: cfg.heartbeat_interval_ms,
            heartbeat_blink_ms: cfg.heartbeat_blink_ms,
            motion: false,
            last_heartbeat_ms: now,
            pulse_since_ms: None,
            last_warmup_note_ms: None,
            boot_announced: false,
            heartbeats: 0,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Last reported motion state.
    pub fn motion(&self) -> bool {
        self.motion
    }

    pub fn boot_announced(&self) -> bool {
        self.boot_announced
    }

    pub fn heartbeats(&self) -> u32 {
        self.heartbeats
    }

    pub fn pulse_active(&self) -> bool {
        self.pulse_since_ms.is_some()
    }

    // ── Boot ──────────────────────────────────────────────────

    /// Publish the retained boot announcement once per boot. Retried on
    /// each call until a publish succeeds.
    pub fn announce_boot(
        &mut self,
        ip: Option<core::net::Ipv4Addr>,
        publisher: &mut impl Publisher,
        sink: &mut impl EventSink,
    ) -> bool {
        if self.boot_announced || !publisher.is_connected() {
            return false;
        }
        let Some(payload) = encode(&BootMessage::new(&self.device, ip)) else {
            return false;
        };
        if publisher.publish(&self.topics.health, &payload, true) {
            self.boot_announced = true;
            sink.emit(&AppEvent::Booted { ip });
        }
        self.boot_announced
    }

    // ── Sensor results ────────────────────────────────────────

    /// Periodic "still warming up" note while the PIR is gated.
    pub fn on_warmup(&mut self, now: u32, remaining_ms: u32, sink: &mut impl EventSink) {
        let due = match self.last_warmup_note_ms {
            None => true,
            Some(t) => now.wrapping_sub(t) >= WARMUP_NOTE_INTERVAL_MS,
        };
        if due {
            self.last_warmup_note_ms = Some(now);
            sink.emit(&AppEvent::WarmingUp { remaining_ms });
        }
    }

    /// Report a qualified transition (or note a suppressed rising edge).
    pub fn on_sample<P: StatefulOutputPin>(
        &mut self,
        now: u32,
        sample: &PirSample,
        publisher: &mut impl Publisher,
        led: &mut Indicator<P>,
        led_busy: bool,
        sink: &mut impl EventSink,
    ) {
        if sample.suppressed {
            sink.emit(&AppEvent::RisingSuppressed { at_ms: now });
        }
        if !sample.is_edge {
            return;
        }

        self.motion = sample.rising;
        let published = encode(&MotionMessage { device: &self.device, motion: self.motion, ts: now })
            .is_some_and(|payload| publisher.publish(&self.topics.state, &payload, false));
        info!("PIR: motion={} at {} ms", self.motion, now);
        sink.emit(&AppEvent::MotionChanged { motion: self.motion, at_ms: now, published });

        // The pulse end and pre-alert end pick up the new state themselves.
        if !led_busy && self.pulse_since_ms.is_none() {
            self.show_motion(led, false);
        }
    }

    /// Drive the LED to reflect the motion state. `restore` also darkens a
    /// `Disabled` indicator after a pulse.
    pub fn show_motion<P: StatefulOutputPin>(&self, led: &mut Indicator<P>, restore: bool) {
        match self.motion_indicator {
            MotionIndicator::LitDuringMotion => led.set(self.motion),
            MotionIndicator::LitWhileIdle => led.set(!self.motion),
            MotionIndicator::Disabled if restore => led.off(),
            MotionIndicator::Disabled => {}
        }
    }

    // ── Heartbeat ─────────────────────────────────────────────

    /// Publish a heartbeat if one is due. A heartbeat missed while offline
    /// goes out on the first connected tick.
    pub fn maybe_heartbeat<P: StatefulOutputPin>(
        &mut self,
        now: u32,
        publisher: &mut impl Publisher,
        led: &mut Indicator<P>,
        led_busy: bool,
        sink: &mut impl EventSink,
    ) -> bool {
        if now.wrapping_sub(self.last_heartbeat_ms) < self.heartbeat_interval_ms || !publisher.is_connected() {
            return false;
        }
        let Some(payload) = encode(&HealthMessage { device: &self.device, uptime_ms: now }) else {
            return false;
        };
        if !publisher.publish(&self.topics.health, &payload, false) {
            return false;
        }
        self.last_heartbeat_ms = now;
        self.heartbeats = self.heartbeats.wrapping_add(1);
        sink.emit(&AppEvent::Heartbeat { uptime_ms: now });

        if !led_busy {
            led.set(true);
            self.pulse_since_ms = Some(now);
        }
        true
    }

    /// End the heartbeat blink once `heartbeat_blink_ms` has passed. If the
    /// LED was taken over meanwhile the pulse is just forgotten.
    pub fn finish_pulse<P: StatefulOutputPin>(&mut self, now: u32, led: &mut Indicator<P>, led_busy: bool) {
        let Some(since) = self.pulse_since_ms else {
            return;
        };
        if led_busy {
            self.pulse_since_ms = None;
            return;
        }
        if now.wrapping_sub(since) >= self.heartbeat_blink_ms {
            self.pulse_since_ms = None;
            self.show_motion(led, true);
        }
    }
}
