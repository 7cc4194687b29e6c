//! End-to-end `MotionNode` scenarios against mock pins, network and broker.

use pirnode::app::events::{AppEvent, PrealertEnd};
use pirnode::app::service::MotionNode;
use pirnode::config::{MotionIndicator, NodeConfig};
use pirnode::error::{Error, FatalError, Rejected};

use super::mock_hw::{ManualClock, MockInput, MockNetwork, MockOutput, MockSession, RecordingSink};

type Node = MotionNode<MockInput, MockOutput, MockNetwork, MockSession>;

const PREALERT_TOPIC: &str = "iot/eldercare/room1/cmd/prealert";
const TICK_MS: u32 = 50;

struct Rig {
    node: Node,
    pir: MockInput,
    led: MockOutput,
    clock: ManualClock,
    sink: RecordingSink,
}

impl Rig {
    fn new(cfg: &NodeConfig, network: MockNetwork) -> Self {
        let pir = MockInput::default();
        let led = MockOutput::new();
        let clock = ManualClock::at(0);
        let node = MotionNode::new(cfg, "esp8266_test", pir.clone(), led.clone(), network, MockSession::default(), 0);
        Self { node, pir, led, clock, sink: RecordingSink::default() }
    }

    fn booted(cfg: &NodeConfig) -> Self {
        let mut rig = Self::new(cfg, MockNetwork::default());
        let mut delay = rig.clock.clone();
        rig.node.boot(&rig.clock, &mut delay, &mut rig.sink).unwrap();
        rig
    }

    fn tick_at(&mut self, now: u32) {
        self.clock.set(now);
        self.node.tick(now, &mut self.sink).unwrap();
    }

    /// Tick every `TICK_MS` up to and including `end`.
    fn run_until(&mut self, end: u32) {
        loop {
            let next = self.clock.0.get() + TICK_MS;
            if next > end {
                break;
            }
            self.tick_at(next);
        }
    }

    fn broker(&mut self) -> &mut MockSession {
        self.node.session_mut().session_mut()
    }

    /// `(motion, ts)` of every published state message.
    fn motion_reports(&mut self) -> Vec<(bool, u32)> {
        self.broker()
            .on_topic("/motion/state")
            .iter()
            .map(|p| {
                let v: serde_json::Value = serde_json::from_str(&p.payload).unwrap();
                (v["motion"].as_bool().unwrap(), v["ts"].as_u64().unwrap() as u32)
            })
            .collect()
    }
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_announces_retained_once_and_subscribes() {
    let mut rig = Rig::booted(&NodeConfig::default());
    rig.run_until(2_000);
    assert_eq!(rig.node.tick_count(), 40);

    let broker = rig.broker();
    assert_eq!(broker.client_id, "esp8266_test");
    assert_eq!(broker.subscribes, vec![PREALERT_TOPIC.to_string()]);
    let health = broker.on_topic("/motion/health");
    assert_eq!(health.len(), 1);
    assert!(health[0].retain);
    assert_eq!(health[0].payload, r#"{"device":"esp8266_test","boot":true,"ip":"192.168.0.61"}"#);

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::SessionEstablished { reconnects: 0 })), 1);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::Booted { ip: Some(_) })), 1);
}

#[test]
fn boot_restarts_after_wifi_attempts_exhausted() {
    let mut cfg = NodeConfig::default();
    cfg.wifi_max_attempts = 3;
    let mut rig = Rig::new(&cfg, MockNetwork { fail_next: u32::MAX, ..Default::default() });
    let mut delay = rig.clock.clone();

    let err = rig.node.boot(&rig.clock, &mut delay, &mut rig.sink).unwrap_err();

    assert_eq!(err, Error::Fatal(FatalError::WifiAssociationTimeout { attempts: 3 }));
    assert_eq!(rig.node.session().network().connect_calls, 3);
    assert!(rig.clock.0.get() >= 2 * cfg.reconnect_delay_ms, "attempts are spaced by the retry delay");
    assert!(rig.sink.events.contains(&AppEvent::Fatal(FatalError::WifiAssociationTimeout { attempts: 3 })));
    assert_eq!(rig.node.session().session().connect_calls, 0);
}

// ── PIR → broker ──────────────────────────────────────────────

#[test]
fn warmup_gates_sensor_then_first_motion_reports() {
    let mut rig = Rig::booted(&NodeConfig::default());
    rig.pir.set(true);
    rig.run_until(29_950);

    assert!(rig.motion_reports().is_empty());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::WarmingUp { .. })), 6);

    rig.tick_at(30_000);
    assert_eq!(rig.motion_reports(), vec![(true, 30_000)]);
    let state = rig.broker().on_topic("/motion/state")[0].clone();
    assert_eq!(state.payload, r#"{"device":"esp8266_test","motion":true,"ts":30000}"#);
    assert!(!state.retain);

    rig.run_until(30_200);
    assert!(rig.led.lit_active_low(), "pin LOW while motion is present");
}

#[test]
fn chatter_after_confirmed_rise_publishes_nothing() {
    let mut rig = Rig::booted(&NodeConfig::default());
    rig.run_until(30_950);

    rig.pir.set(true);
    rig.tick_at(31_000);
    rig.pir.set(false);
    rig.tick_at(31_001);
    rig.pir.set(true);
    rig.tick_at(31_002);

    assert_eq!(rig.motion_reports(), vec![(true, 31_000)]);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::RisingSuppressed { .. })), 0);
}

#[test]
fn motion_cycle_requalifies_after_quiet_low_run() {
    let mut rig = Rig::booted(&NodeConfig::default());
    rig.run_until(30_950);
    rig.pir.set(true);
    rig.tick_at(31_000);
    rig.pir.set(false);
    rig.run_until(34_950);
    rig.pir.set(true);
    rig.run_until(35_500);

    // Falling qualifies on the first tick past the debounce window; the next
    // rise waits out the window from the falling edge.
    assert_eq!(rig.motion_reports(), vec![(true, 31_000), (false, 33_050), (true, 35_100)]);
}

#[test]
fn retrigger_without_quiet_low_is_suppressed() {
    let mut rig = Rig::booted(&NodeConfig::default());
    rig.run_until(30_950);
    rig.pir.set(true);
    rig.tick_at(31_000);
    rig.pir.set(false);
    rig.run_until(33_450);
    rig.pir.set(true);
    rig.run_until(36_000);

    assert_eq!(rig.motion_reports(), vec![(true, 31_000), (false, 33_050)]);
    assert!(rig.sink.events.contains(&AppEvent::RisingSuppressed { at_ms: 35_100 }));
    assert!(!rig.node.reporter().motion());
}

#[test]
fn edges_while_offline_are_tracked_but_not_queued() {
    let mut rig = Rig::booted(&NodeConfig::default());
    rig.run_until(30_950);
    rig.broker().drop_link(u32::MAX);
    rig.pir.set(true);
    rig.tick_at(31_000);

    assert!(rig.motion_reports().is_empty());
    assert!(rig.node.reporter().motion());
    assert!(rig.sink.events.contains(&AppEvent::MotionChanged { motion: true, at_ms: 31_000, published: false }));

    rig.broker().refuse_next = 0;
    rig.run_until(34_000);
    assert!(rig.motion_reports().is_empty(), "missed edges are not replayed");
}

// ── Heartbeat ─────────────────────────────────────────────────

#[test]
fn heartbeat_every_interval_with_short_pulse() {
    let mut rig = Rig::booted(&NodeConfig::default());
    rig.run_until(4_950);
    assert!(!rig.led.lit_active_low());

    rig.run_until(5_000);
    assert!(rig.led.lit_active_low(), "pulse on");
    rig.run_until(5_100);
    assert!(!rig.led.lit_active_low(), "pulse off after heartbeat_blink_ms");

    rig.run_until(20_000);
    let beats: Vec<String> = rig
        .broker()
        .on_topic("/motion/health")
        .iter()
        .filter(|p| !p.retain)
        .map(|p| p.payload.clone())
        .collect();
    assert_eq!(beats.len(), 4);
    assert_eq!(beats[0], r#"{"device":"esp8266_test","uptime_ms":5000}"#);
    assert_eq!(beats[3], r#"{"device":"esp8266_test","uptime_ms":20000}"#);
}

#[test]
fn no_heartbeat_while_disconnected_and_fixed_retry_spacing() {
    let mut rig = Rig::booted(&NodeConfig::default());
    rig.run_until(6_000);
    rig.broker().drop_link(u32::MAX);
    rig.run_until(20_000);

    let connects_while_down = rig.broker().connect_calls - 1;
    assert_eq!(connects_while_down, 7, "one attempt per 2 s from 6050 to 18050");
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ReconnectFailed(_))), 7);
    assert_eq!(rig.broker().on_topic("/motion/health").iter().filter(|p| !p.retain).count(), 1);

    rig.broker().refuse_next = 0;
    rig.run_until(20_050);
    let broker = rig.broker();
    assert_eq!(broker.subscribes.len(), 2, "resubscribed exactly once on reconnect");
    let beats: Vec<_> = broker.on_topic("/motion/health").into_iter().filter(|p| !p.retain).collect();
    assert_eq!(beats.len(), 2, "overdue heartbeat goes out on the first connected tick");
    assert_eq!(beats[1].payload, r#"{"device":"esp8266_test","uptime_ms":20050}"#);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::SessionEstablished { reconnects: 1 })), 1);
    assert_eq!(rig.broker().on_topic("/motion/health").iter().filter(|p| p.retain).count(), 1);
}

// ── Pre-alert ─────────────────────────────────────────────────

#[test]
fn prealert_blinks_until_stop_and_ends_dark() {
    let mut cfg = NodeConfig::default();
    cfg.motion_indicator = MotionIndicator::LitWhileIdle;
    let mut rig = Rig::booted(&cfg);
    assert!(rig.led.lit_active_low(), "idle indication before any motion");

    rig.run_until(1_000);
    rig.broker().push(PREALERT_TOPIC, br#"{"action":"start","reason":"INACTIVITY","ttl_sec":300}"#);
    rig.tick_at(1_050);
    assert!(rig.sink.events.contains(&AppEvent::PrealertStarted { duration_ms: 300_000 }));
    assert!(rig.node.blinker().is_active());

    let mut transitions = 0;
    let mut last = rig.led.lit_active_low();
    for t in (1_100..=3_050).step_by(TICK_MS as usize) {
        rig.tick_at(t);
        if rig.led.lit_active_low() != last {
            transitions += 1;
            last = !last;
        }
    }
    assert_eq!(transitions, 5, "toggle every 400 ms");

    rig.broker().push(PREALERT_TOPIC, br#"{"action":"stop","reason":"INACTIVITY"}"#);
    rig.tick_at(3_100);
    assert!(!rig.node.blinker().is_active());
    assert!(!rig.led.lit_active_low());
    assert!(rig.sink.events.contains(&AppEvent::PrealertEnded(PrealertEnd::Stopped)));
}

#[test]
fn prealert_runs_fixed_duration_and_ignores_ttl_by_default() {
    let mut cfg = NodeConfig::default();
    cfg.prealert_duration_ms = 2_000;
    let mut rig = Rig::booted(&cfg);
    rig.broker().push(PREALERT_TOPIC, br#"{"action":"start","ttl_sec":60}"#);
    rig.tick_at(100);
    assert!(rig.sink.events.contains(&AppEvent::PrealertStarted { duration_ms: 2_000 }));

    rig.run_until(2_100);
    assert!(rig.node.blinker().is_active(), "elapsed == duration is still active");
    rig.run_until(2_150);
    assert!(!rig.node.blinker().is_active());
    assert!(rig.sink.events.contains(&AppEvent::PrealertEnded(PrealertEnd::TimedOut)));
    assert!(!rig.led.lit_active_low());
}

#[test]
fn prealert_ttl_honored_when_enabled() {
    let mut cfg = NodeConfig::default();
    cfg.prealert_honor_ttl = true;
    let mut rig = Rig::booted(&cfg);
    rig.broker().push(PREALERT_TOPIC, br#"{"action":"start","ttl_sec":1}"#);
    rig.tick_at(50);
    assert!(rig.sink.events.contains(&AppEvent::PrealertStarted { duration_ms: 1_000 }));
    rig.run_until(1_100);
    assert!(!rig.node.blinker().is_active());
}

#[test]
fn restart_while_active_extends_without_stacking() {
    let mut cfg = NodeConfig::default();
    cfg.prealert_duration_ms = 2_000;
    let mut rig = Rig::booted(&cfg);
    rig.broker().push(PREALERT_TOPIC, br#"{"action":"start"}"#);
    rig.tick_at(50);
    rig.run_until(1_500);
    rig.broker().push(PREALERT_TOPIC, br#"{"action":"start"}"#);
    rig.tick_at(1_550);
    assert_eq!(rig.node.blinker().state().end_ms, 3_550);

    rig.run_until(3_500);
    assert!(rig.node.blinker().is_active());
    rig.run_until(3_600);
    assert!(!rig.node.blinker().is_active());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::PrealertStarted { .. })), 2);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::PrealertEnded(_))), 1);
}

#[test]
fn heartbeat_pulse_skipped_during_prealert() {
    let mut cfg = NodeConfig::default();
    cfg.blink_period_ms = 10_000;
    let mut rig = Rig::booted(&cfg);
    rig.broker().push(PREALERT_TOPIC, br#"{"action":"start"}"#);
    rig.tick_at(4_000);
    assert!(rig.led.lit_active_low());
    let writes = rig.led.writes.get();

    rig.run_until(5_200);
    assert_eq!(rig.led.writes.get(), writes, "heartbeat did not touch the LED");
    assert_eq!(rig.node.reporter().heartbeats(), 1);
}

#[test]
fn bad_commands_change_nothing() {
    let mut rig = Rig::booted(&NodeConfig::default());
    rig.broker().push(PREALERT_TOPIC, b"not json");
    rig.broker().push(PREALERT_TOPIC, br#"{"action":"explode"}"#);
    rig.broker().push(PREALERT_TOPIC, br#"{"reason":"INACTIVITY"}"#);
    rig.broker().push("iot/eldercare/room2/cmd/prealert", br#"{"action":"start"}"#);
    rig.tick_at(50);

    assert!(!rig.node.blinker().is_active());
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::CommandIgnored(Rejected::Malformed))),
        2
    );
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::CommandIgnored(Rejected::UnknownAction))),
        1
    );
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::CommandIgnored(Rejected::Unrouted))), 0);
}
