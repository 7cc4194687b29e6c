//! Network + MQTT session maintenance.
//!
//! [`SessionManager`] owns the transport ([`NetworkPort`]) and the pub/sub
//! session ([`SessionPort`]) and keeps both alive for an unattended device:
//! failures are retried forever with a fixed delay, never surfaced as
//! errors the loop has to act on, except for Wi-Fi association exhausting
//! its attempt budget (the device restarts).
//!
//! ```text
//!                  attempt ok
//!  Disconnected ───────────────────────▶ Connected
//!       │  attempt failed                  │  link dropped
//!       ▼                                  │
//!  Backoff{attempt} ◀──────────────────────┘
//!       │  reconnect_delay_ms elapsed → next attempt
//! ```
//!
//! `ensure_connected` makes at most one attempt per call so the tick loop
//! keeps sampling and blinking during an outage. `wait_connected` is the
//! blocking form, used before the loop starts.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::{
    Clock, CommandHandler, CommandKind, NetworkPort, Publisher, SessionCredentials, SessionPort,
};
use crate::config::{HostString, NodeConfig, SecretString, ShortString, TopicString};
use crate::error::{CommsError, Error, FatalError, Rejected, Result};

/// Maximum number of declared subscriptions.
pub const MAX_SUBSCRIPTIONS: usize = 4;

/// Link state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    /// Waiting `reconnect_delay_ms` after the `attempt`-th failure.
    Backoff { attempt: u32, since_ms: u32 },
    Connected,
}

/// What `ensure_connected` found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Already up; nothing was done.
    Connected,
    /// Connected by this call; subscriptions were re-issued.
    Established,
    /// Waiting out the retry delay.
    Reconnecting { attempt: u32 },
}

/// A declared subscription and the handler channel it routes to.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub topic: TopicString,
    pub kind: CommandKind,
}

/// Broker endpoint and identity, copied out of [`NodeConfig`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub host: HostString,
    pub port: u16,
    pub client_id: ShortString,
    pub username: ShortString,
    pub password: SecretString,
    pub keepalive_secs: u16,
    pub reconnect_delay_ms: u32,
    pub wifi_max_attempts: u32,
}

impl SessionSettings {
    pub fn from_config(cfg: &NodeConfig, client_id: &str) -> Self {
        let mut id = ShortString::new();
        let _ = id.push_str(client_id);
        Self {
            host: cfg.broker_host.clone(),
            port: cfg.broker_port,
            client_id: id,
            username: cfg.mqtt_username.clone(),
            password: cfg.mqtt_password.clone(),
            keepalive_secs: cfg.keepalive_secs,
            reconnect_delay_ms: cfg.reconnect_delay_ms,
            wifi_max_attempts: cfg.wifi_max_attempts,
        }
    }

    fn credentials(&self) -> SessionCredentials<'_> {
        let user = (!self.username.is_empty()).then_some(self.username.as_str());
        SessionCredentials {
            host: &self.host,
            port: self.port,
            client_id: &self.client_id,
            username: user,
            password: user.map(|_| self.password.as_str()),
            keepalive_secs: self.keepalive_secs,
        }
    }
}

pub struct SessionManager<N, S> {
    network: N,
    session: S,
    settings: SessionSettings,
    link: LinkState,
    subscriptions: heapless::Vec<Subscription, MAX_SUBSCRIPTIONS>,
    wifi_failures: u32,
    /// Successful (re)connects since boot.
    connects: u32,
}

impl<N: NetworkPort, S: SessionPort> SessionManager<N, S> {
    pub fn new(network: N, session: S, settings: SessionSettings) -> Self {
        Self {
            network,
            session,
            settings,
            link: LinkState::Disconnected,
            subscriptions: heapless::Vec::new(),
            wifi_failures: 0,
            connects: 0,
        }
    }

    /// Declare a topic to subscribe on every (re)connect. Messages on it are
    /// routed to the command handler as `kind`. If the link is already up
    /// the subscription is issued immediately.
    pub fn declare(&mut self, topic: &str, kind: CommandKind) -> bool {
        let mut t = TopicString::new();
        if t.push_str(topic).is_err() {
            warn!("Session: topic too long, not declared: {}", topic);
            return false;
        }
        if self.subscriptions.push(Subscription { topic: t, kind }).is_err() {
            warn!("Session: subscription table full, not declared: {}", topic);
            return false;
        }
        if self.link == LinkState::Connected && self.session.subscribe(topic).is_err() {
            warn!("Session: subscribe {} failed", topic);
        }
        true
    }

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn connects(&self) -> u32 {
        self.connects
    }

    pub fn local_ip(&self) -> Option<core::net::Ipv4Addr> {
        self.network.local_ip()
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    fn link_up(&self) -> bool {
        self.network.is_connected() && self.session.is_connected()
    }

    /// Idempotent connect. Never blocks longer than one bounded attempt.
    pub fn ensure_connected(&mut self, now: u32) -> Result<SessionStatus> {
        match self.link {
            LinkState::Connected if self.link_up() => return Ok(SessionStatus::Connected),
            LinkState::Connected => {
                warn!("Session: link lost, reconnecting");
                self.link = LinkState::Disconnected;
            }
            LinkState::Backoff { attempt, since_ms } => {
                if now.wrapping_sub(since_ms) < self.settings.reconnect_delay_ms {
                    return Ok(SessionStatus::Reconnecting { attempt });
                }
            }
            LinkState::Disconnected => {}
        }

        match self.attempt() {
            Ok(()) => {
                self.link = LinkState::Connected;
                self.connects = self.connects.wrapping_add(1);
                info!("Session: MQTT connected ({} subscriptions)", self.subscriptions.len());
                Ok(SessionStatus::Established)
            }
            Err(e) => {
                let attempt = match self.link {
                    LinkState::Backoff { attempt, .. } => attempt + 1,
                    _ => 1,
                };
                self.link = LinkState::Backoff { attempt, since_ms: now };
                if !e.is_fatal() {
                    warn!("Session: {} (attempt {}), retry in {} ms", e, attempt, self.settings.reconnect_delay_ms);
                }
                Err(e)
            }
        }
    }

    /// One full connect attempt: transport, then session, then subscriptions.
    fn attempt(&mut self) -> Result<()> {
        if !self.network.is_connected() {
            match self.network.connect() {
                Ok(()) => {
                    self.wifi_failures = 0;
                    info!("Session: WiFi connected, IP: {:?}", self.network.local_ip());
                }
                Err(e) => {
                    self.wifi_failures += 1;
                    warn!(
                        "Session: WiFi association failed: {} ({}/{})",
                        e, self.wifi_failures, self.settings.wifi_max_attempts
                    );
                    if self.wifi_failures >= self.settings.wifi_max_attempts {
                        return Err(FatalError::WifiAssociationTimeout {
                            attempts: self.wifi_failures,
                        }
                        .into());
                    }
                    return Err(CommsError::WifiConnectFailed.into());
                }
            }
        }

        info!("Session: connecting to MQTT {}:{}", self.settings.host, self.settings.port);
        let creds = self.settings.credentials();
        if let Err(e) = self.session.connect(&creds) {
            let rc = match e {
                crate::app::ports::SessionError::ConnectFailed(rc) => rc,
                _ => -1,
            };
            return Err(CommsError::SessionConnectFailed(rc).into());
        }

        // Broker-side session state is not assumed to survive a drop.
        for sub in &self.subscriptions {
            if self.session.subscribe(&sub.topic).is_err() {
                return Err(CommsError::SubscribeFailed.into());
            }
            debug!("Session: subscribed {}", sub.topic);
        }
        Ok(())
    }

    /// Blocking connect: retry with the fixed delay until up or fatal.
    pub fn wait_connected(&mut self, clock: &impl Clock, delay: &mut impl DelayNs) -> Result<SessionStatus> {
        loop {
            match self.ensure_connected(clock.now_ms()) {
                Ok(SessionStatus::Reconnecting { .. }) | Err(Error::Transient(_)) => {
                    delay.delay_ms(self.settings.reconnect_delay_ms.min(100));
                }
                other => return other,
            }
        }
    }

    /// Drain inbound messages and route them by topic. Non-blocking.
    pub fn service_tick(&mut self, handler: &mut impl CommandHandler) {
        if self.link != LinkState::Connected {
            return;
        }
        let Self { session, subscriptions, .. } = self;
        session.service(&mut |topic, payload| {
            let outcome = match subscriptions.iter().find(|s| s.topic.as_str() == topic) {
                Some(sub) => handler.handle(sub.kind, payload),
                None => Err(Rejected::Unrouted.into()),
            };
            if let Err(e) = outcome {
                debug!("Session: message on {} dropped: {}", topic, e);
            }
        });
    }
}

impl<N: NetworkPort, S: SessionPort> Publisher for SessionManager<N, S> {
    fn is_connected(&self) -> bool {
        self.link == LinkState::Connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> bool {
        if self.link != LinkState::Connected {
            debug!("Session: offline, dropped publish to {}", topic);
            return false;
        }
        match self.session.publish(topic, payload, retain) {
            Ok(()) => {
                debug!("MQTT → {} : {}", topic, core::str::from_utf8(payload).unwrap_or("<binary>"));
                true
            }
            Err(e) => {
                warn!("Session: publish to {} failed: {}", topic, e);
                false
            }
        }
    }
}
