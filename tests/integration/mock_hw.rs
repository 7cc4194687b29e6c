//! Mock adapters for integration tests.
//!
//! Pins and the clock share their state through `Rc<Cell<_>>` handles so a
//! test keeps control after moving them into a `MotionNode`. Network and
//! session mocks record every call and are reached back through
//! `node.session_mut()`.

use std::cell::Cell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::Ipv4Addr;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};
use pirnode::app::events::AppEvent;
use pirnode::app::ports::{
    Clock, EventSink, NetworkError, NetworkPort, SessionCredentials, SessionError, SessionPort,
};

// ── Pins ──────────────────────────────────────────────────────

/// PIR line driven by the test.
#[derive(Clone, Default)]
pub struct MockInput(pub Rc<Cell<bool>>);

impl MockInput {
    pub fn set(&self, high: bool) {
        self.0.set(high);
    }
}

impl ErrorType for MockInput {
    type Error = Infallible;
}

impl InputPin for MockInput {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }
}

/// Output latch; `high` is the raw pin level.
#[derive(Clone)]
pub struct MockOutput {
    pub high: Rc<Cell<bool>>,
    pub writes: Rc<Cell<u32>>,
}

#[allow(dead_code)]
impl MockOutput {
    pub fn new() -> Self {
        Self { high: Rc::new(Cell::new(false)), writes: Rc::new(Cell::new(0)) }
    }

    /// LED lit, for an active-low LED.
    pub fn lit_active_low(&self) -> bool {
        !self.high.get()
    }
}

impl ErrorType for MockOutput {
    type Error = Infallible;
}

impl OutputPin for MockOutput {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high.set(false);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high.set(true);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

impl StatefulOutputPin for MockOutput {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.high.get())
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.high.get())
    }
}

// ── Time ──────────────────────────────────────────────────────

/// Manually advanced clock. Delays advance it too, so blocking retry
/// loops terminate.
#[derive(Clone, Default)]
pub struct ManualClock(pub Rc<Cell<u32>>);

#[allow(dead_code)]
impl ManualClock {
    pub fn at(ms: u32) -> Self {
        Self(Rc::new(Cell::new(ms)))
    }

    pub fn set(&self, ms: u32) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.0.set(self.0.get().wrapping_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

impl DelayNs for ManualClock {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(ns.div_ceil(1_000_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms);
    }
}

// ── Network ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNetwork {
    pub up: bool,
    /// Fail this many association attempts before succeeding.
    pub fail_next: u32,
    pub connect_calls: u32,
}

impl NetworkPort for MockNetwork {
    fn connect(&mut self) -> Result<(), NetworkError> {
        self.connect_calls += 1;
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(NetworkError::ConnectionFailed);
        }
        self.up = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.up
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.up.then_some(Ipv4Addr::new(192, 168, 0, 61))
    }
}

// ── Session ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Default)]
pub struct MockSession {
    pub up: bool,
    /// Refuse this many connects before accepting.
    pub refuse_next: u32,
    pub connect_calls: u32,
    pub client_id: String,
    pub subscribes: Vec<String>,
    pub published: Vec<Published>,
    pub inbox: VecDeque<(String, Vec<u8>)>,
}

#[allow(dead_code)]
impl MockSession {
    /// Simulate a broker-side drop; the next `refuse` connects fail.
    pub fn drop_link(&mut self, refuse: u32) {
        self.up = false;
        self.refuse_next = refuse;
    }

    pub fn on_topic(&self, suffix: &str) -> Vec<&Published> {
        self.published.iter().filter(|p| p.topic.ends_with(suffix)).collect()
    }

    pub fn push(&mut self, topic: &str, payload: &[u8]) {
        self.inbox.push_back((topic.to_string(), payload.to_vec()));
    }
}

impl SessionPort for MockSession {
    fn connect(&mut self, creds: &SessionCredentials<'_>) -> Result<(), SessionError> {
        self.connect_calls += 1;
        self.client_id = creds.client_id.to_string();
        if self.refuse_next > 0 {
            self.refuse_next -= 1;
            return Err(SessionError::ConnectFailed(-2));
        }
        self.up = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.up
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), SessionError> {
        if !self.up {
            return Err(SessionError::NotConnected);
        }
        self.published.push(Published {
            topic: topic.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            retain,
        });
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        self.subscribes.push(topic.to_string());
        Ok(())
    }

    fn service(&mut self, deliver: &mut dyn FnMut(&str, &[u8])) {
        while let Some((topic, payload)) = self.inbox.pop_front() {
            deliver(&topic, &payload);
        }
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
