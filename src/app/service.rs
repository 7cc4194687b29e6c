//! Application service: the hexagonal core.
//!
//! [`MotionNode`] owns the debouncer, the indicator, the pre-alert blinker,
//! the reporter and the session manager. One call to [`MotionNode::tick`] is
//! one full pass of the main loop. All I/O flows through pins and port
//! traits injected at construction, so the whole node runs against mocks.
//!
//! ```text
//!   InputPin ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                │          MotionNode           │
//!  OutputPin ◀── │ Debouncer · Reporter · Blinker│ ◀─▶ SessionManager
//!                └──────────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, StatefulOutputPin};
use log::{info, warn};

use crate::config::NodeConfig;
use crate::drivers::indicator::Indicator;
use crate::drivers::prealert::PrealertBlinker;
use crate::error::{Error, Result};
use crate::sensors::pir::{PirConfig, PirDebouncer};
use crate::session::{SessionManager, SessionSettings, SessionStatus};

use super::commands::{parse_prealert, PrealertCommand};
use super::events::{AppEvent, PrealertEnd};
use super::ports::{Clock, CommandHandler, CommandKind, EventSink, NetworkPort, SessionPort};
use super::reporter::MotionReporter;

// ───────────────────────────────────────────────────────────────
// MotionNode
// ───────────────────────────────────────────────────────────────

pub struct MotionNode<I, O, N, S> {
    pir: PirDebouncer<I>,
    led: Indicator<O>,
    blinker: PrealertBlinker,
    reporter: MotionReporter,
    session: SessionManager<N, S>,
    honor_ttl: bool,
    tick_count: u64,
}

impl<I, O, N, S> MotionNode<I, O, N, S>
where
    I: InputPin,
    O: StatefulOutputPin,
    N: NetworkPort,
    S: SessionPort,
{
    /// Assemble the node. `boot_ms` starts the PIR warmup window and the
    /// first heartbeat period; the indicator starts in its idle state.
    pub fn new(
        cfg: &NodeConfig,
        device_id: &str,
        pir_pin: I,
        led_pin: O,
        network: N,
        session: S,
        boot_ms: u32,
    ) -> Self {
        let reporter = MotionReporter::new(cfg, device_id, boot_ms);
        let mut session = SessionManager::new(network, session, SessionSettings::from_config(cfg, device_id));
        session.declare(&reporter.topics().prealert_cmd, CommandKind::Prealert);

        let mut led = Indicator::new(led_pin, cfg.indicator_polarity);
        led.off();
        reporter.show_motion(&mut led, false);

        Self {
            pir: PirDebouncer::new(pir_pin, PirConfig::from(cfg), boot_ms),
            led,
            blinker: PrealertBlinker::new(cfg.prealert_duration_ms, cfg.blink_period_ms),
            reporter,
            session,
            honor_ttl: cfg.prealert_honor_ttl,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Block until the session is up, then announce the boot.
    /// Returns only a fatal error.
    pub fn boot(&mut self, clock: &impl Clock, delay: &mut impl DelayNs, sink: &mut impl EventSink) -> Result<()> {
        info!("MotionNode: booting as {}", self.reporter.device());
        match self.session.wait_connected(clock, delay) {
            Ok(status) => {
                self.on_session_status(status, sink);
                Ok(())
            }
            Err(Error::Fatal(f)) => {
                sink.emit(&AppEvent::Fatal(f));
                Err(Error::Fatal(f))
            }
            Err(e) => {
                warn!("MotionNode: boot connect ended with {}", e);
                Ok(())
            }
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One pass: session upkeep, inbound commands, pre-alert, PIR,
    /// heartbeat. Only a fatal error escapes.
    pub fn tick(&mut self, now: u32, sink: &mut impl EventSink) -> Result<()> {
        self.tick_count += 1;

        // 1. Session upkeep (at most one bounded connect attempt)
        match self.session.ensure_connected(now) {
            Ok(status) => self.on_session_status(status, sink),
            Err(Error::Transient(e)) => sink.emit(&AppEvent::ReconnectFailed(e)),
            Err(Error::Fatal(f)) => {
                sink.emit(&AppEvent::Fatal(f));
                return Err(Error::Fatal(f));
            }
            Err(Error::Ignored(_)) => {}
        }

        // 2. Inbound commands
        let mut control = PrealertControl {
            blinker: &mut self.blinker,
            led: &mut self.led,
            now,
            honor_ttl: self.honor_ttl,
            sink: &mut *sink,
        };
        self.session.service_tick(&mut control);

        // 3. Pre-alert blink / expiry
        if let Some(end) = self.blinker.update(now, &mut self.led) {
            sink.emit(&AppEvent::PrealertEnded(end));
        }
        let led_busy = self.blinker.is_active();

        // 4. PIR
        let sample = self.pir.poll(now);
        if sample.sampled {
            self.reporter
                .on_sample(now, &sample, &mut self.session, &mut self.led, led_busy, sink);
        } else {
            let remaining = self.pir.warmup_remaining(now);
            if remaining > 0 {
                self.reporter.on_warmup(now, remaining, sink);
            }
        }

        // 5. Heartbeat
        self.reporter
            .maybe_heartbeat(now, &mut self.session, &mut self.led, led_busy, sink);
        self.reporter.finish_pulse(now, &mut self.led, led_busy);

        Ok(())
    }

    fn on_session_status(&mut self, status: SessionStatus, sink: &mut impl EventSink) {
        if status != SessionStatus::Established {
            return;
        }
        sink.emit(&AppEvent::SessionEstablished {
            reconnects: self.session.connects().saturating_sub(1),
        });
        let ip = self.session.local_ip();
        self.reporter.announce_boot(ip, &mut self.session, sink);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn pir(&self) -> &PirDebouncer<I> {
        &self.pir
    }

    pub fn reporter(&self) -> &MotionReporter {
        &self.reporter
    }

    pub fn blinker(&self) -> &PrealertBlinker {
        &self.blinker
    }

    pub fn session(&self) -> &SessionManager<N, S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager<N, S> {
        &mut self.session
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

// ───────────────────────────────────────────────────────────────
// Command handling
// ───────────────────────────────────────────────────────────────

/// Routes pre-alert commands to the blinker for the current tick.
struct PrealertControl<'a, O, E> {
    blinker: &'a mut PrealertBlinker,
    led: &'a mut Indicator<O>,
    now: u32,
    honor_ttl: bool,
    sink: &'a mut E,
}

impl<O: StatefulOutputPin, E: EventSink> PrealertControl<'_, O, E> {
    fn prealert(&mut self, payload: &[u8]) -> Result<()> {
        let cmd = parse_prealert(payload).inspect_err(|e| {
            if let Error::Ignored(r) = e {
                self.sink.emit(&AppEvent::CommandIgnored(*r));
            }
        })?;
        match cmd {
            PrealertCommand::Start { ttl_ms } => {
                let ttl = ttl_ms.filter(|_| self.honor_ttl);
                let duration_ms = self.blinker.start(self.now, ttl, self.led);
                self.sink.emit(&AppEvent::PrealertStarted { duration_ms });
            }
            PrealertCommand::Stop => {
                if self.blinker.stop(self.led) {
                    self.sink.emit(&AppEvent::PrealertEnded(PrealertEnd::Stopped));
                }
            }
        }
        Ok(())
    }
}

impl<O: StatefulOutputPin, E: EventSink> CommandHandler for PrealertControl<'_, O, E> {
    fn handle(&mut self, kind: CommandKind, payload: &[u8]) -> Result<()> {
        match kind {
            CommandKind::Prealert => self.prealert(payload),
        }
    }
}
