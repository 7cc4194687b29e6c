//! MQTT session adapter.
//!
//! Implements [`SessionPort`] on top of the ESP-IDF MQTT client.
//!
//! ```text
//!  esp-mqtt task ──callback──▶ INBOX (Channel) ──service()──▶ SessionManager
//!  main loop ──publish/subscribe──▶ EspMqttClient
//! ```
//!
//! The client runs its own FreeRTOS task and delivers events through a
//! callback; received messages are copied into the fixed-capacity static
//! [`INBOX`] and drained by the main loop during `service()`. Nothing else
//! crosses the task boundary except the `SESSION_UP` flag.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//! - **all other targets**: an in-process loopback for host simulation;
//!   [`inject`] plays the broker.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::ports::{SessionCredentials, SessionError, SessionPort};
use crate::config::TopicString;

// ───────────────────────────────────────────────────────────────
// Inbound queue
// ───────────────────────────────────────────────────────────────

/// Largest accepted inbound payload; command payloads are a few dozen bytes.
pub const MAX_INBOUND_PAYLOAD: usize = 256;

/// Queue depth for inbound messages between two main-loop ticks.
const INBOX_DEPTH: usize = 8;

/// One received message, copied out of the client's buffers.
pub struct InboundMessage {
    pub topic: TopicString,
    pub payload: heapless::Vec<u8, MAX_INBOUND_PAYLOAD>,
}

/// Client task → main loop.
pub static INBOX: Channel<CriticalSectionRawMutex, InboundMessage, INBOX_DEPTH> = Channel::new();

/// Copy a message into the inbox. Oversized or overflowing messages are
/// dropped with a warning; the sender never blocks.
pub fn enqueue(topic: &str, payload: &[u8]) -> bool {
    let mut t = TopicString::new();
    if t.push_str(topic).is_err() {
        warn!("MQTT: dropping message, topic too long ({} bytes)", topic.len());
        return false;
    }
    let Ok(p) = heapless::Vec::from_slice(payload) else {
        warn!("MQTT: dropping oversized payload on {} ({} bytes)", topic, payload.len());
        return false;
    };
    if INBOX.try_send(InboundMessage { topic: t, payload: p }).is_err() {
        warn!("MQTT: inbox full, dropping message on {}", topic);
        return false;
    }
    true
}

fn drain(deliver: &mut dyn FnMut(&str, &[u8])) {
    while let Ok(msg) = INBOX.try_receive() {
        deliver(&msg.topic, &msg.payload);
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod platform {
    use core::sync::atomic::{AtomicBool, Ordering};
    use core::time::Duration;

    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::mqtt::client::{Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
    use log::{debug, info, warn};

    use super::enqueue;
    use crate::app::ports::{SessionCredentials, SessionError};

    /// Upper bound on one connect attempt.
    const CONNECT_TIMEOUT_MS: u32 = 5000;
    const CONNECT_POLL_MS: u32 = 50;

    /// Set/cleared by the client task on CONNACK / disconnect.
    static SESSION_UP: AtomicBool = AtomicBool::new(false);

    pub struct MqttAdapter {
        client: Option<EspMqttClient<'static>>,
    }

    impl MqttAdapter {
        pub fn new() -> Self {
            Self { client: None }
        }

        pub(super) fn platform_connect(&mut self, creds: &SessionCredentials<'_>) -> Result<(), SessionError> {
            // A stale client would keep auto-reconnecting behind our back.
            self.client = None;
            SESSION_UP.store(false, Ordering::Release);

            let url = format!("mqtt://{}:{}", creds.host, creds.port);
            let conf = MqttClientConfiguration {
                client_id: Some(creds.client_id),
                username: creds.username,
                password: creds.password,
                keep_alive_interval: Some(Duration::from_secs(u64::from(creds.keepalive_secs))),
                ..Default::default()
            };

            let client = EspMqttClient::new_cb(&url, &conf, |event| match event.payload() {
                EventPayload::Connected(_) => SESSION_UP.store(true, Ordering::Release),
                EventPayload::Disconnected => SESSION_UP.store(false, Ordering::Release),
                EventPayload::Received { topic: Some(topic), data, details: Details::Complete, .. } => {
                    enqueue(topic, data);
                }
                EventPayload::Received { .. } => debug!("MQTT: ignoring fragmented/topicless message"),
                EventPayload::Error(e) => warn!("MQTT: client error {:?}", e),
                _ => {}
            })
            .map_err(|e| SessionError::ConnectFailed(e.code()))?;

            let mut waited = 0;
            while !SESSION_UP.load(Ordering::Acquire) {
                if waited >= CONNECT_TIMEOUT_MS {
                    // MQTT_CONNECT_FAILED in the PubSubClient numbering the
                    // back-end logs already use.
                    return Err(SessionError::ConnectFailed(-2));
                }
                FreeRtos::delay_ms(CONNECT_POLL_MS);
                waited += CONNECT_POLL_MS;
            }
            info!("MQTT: session up ({} ms)", waited);
            self.client = Some(client);
            Ok(())
        }

        pub(super) fn platform_is_connected(&self) -> bool {
            self.client.is_some() && SESSION_UP.load(Ordering::Acquire)
        }

        pub(super) fn platform_publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), SessionError> {
            let client = self.client.as_mut().ok_or(SessionError::NotConnected)?;
            client
                .publish(topic, QoS::AtMostOnce, retain, payload)
                .map(|_| ())
                .map_err(|_| SessionError::PublishFailed)
        }

        pub(super) fn platform_subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
            let client = self.client.as_mut().ok_or(SessionError::NotConnected)?;
            client
                .subscribe(topic, QoS::AtMostOnce)
                .map(|_| ())
                .map_err(|_| SessionError::SubscribeFailed)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host loopback
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod platform {
    use log::info;

    use crate::app::ports::{SessionCredentials, SessionError};

    pub struct MqttAdapter {
        connected: bool,
        /// Simulation: connect attempts left to refuse.
        refuse_connects: u32,
        published: u32,
    }

    impl MqttAdapter {
        pub fn new() -> Self {
            Self { connected: false, refuse_connects: 0, published: 0 }
        }

        /// Simulation: refuse the next `n` connects, then drop the session.
        pub fn sim_drop(&mut self, refuse_next: u32) {
            self.connected = false;
            self.refuse_connects = refuse_next;
        }

        pub fn sim_published(&self) -> u32 {
            self.published
        }

        pub(super) fn platform_connect(&mut self, creds: &SessionCredentials<'_>) -> Result<(), SessionError> {
            if self.refuse_connects > 0 {
                self.refuse_connects -= 1;
                return Err(SessionError::ConnectFailed(-2));
            }
            info!("MQTT(sim): connected to {}:{} as {}", creds.host, creds.port, creds.client_id);
            self.connected = true;
            Ok(())
        }

        pub(super) fn platform_is_connected(&self) -> bool {
            self.connected
        }

        pub(super) fn platform_publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), SessionError> {
            if !self.connected {
                return Err(SessionError::NotConnected);
            }
            self.published += 1;
            info!(
                "MQTT(sim): {} {} {}",
                topic,
                if retain { "[retained]" } else { "" },
                core::str::from_utf8(payload).unwrap_or("<binary>")
            );
            Ok(())
        }

        pub(super) fn platform_subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
            if !self.connected {
                return Err(SessionError::NotConnected);
            }
            info!("MQTT(sim): subscribed {}", topic);
            Ok(())
        }
    }

    /// Simulation: deliver a message as if the broker had sent it.
    pub fn inject(topic: &str, payload: &[u8]) -> bool {
        super::enqueue(topic, payload)
    }
}

pub use platform::MqttAdapter;
#[cfg(not(target_os = "espidf"))]
pub use platform::inject;

impl Default for MqttAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionPort for MqttAdapter {
    fn connect(&mut self, creds: &SessionCredentials<'_>) -> Result<(), SessionError> {
        self.platform_connect(creds)
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), SessionError> {
        self.platform_publish(topic, payload, retain)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        self.platform_subscribe(topic)
    }

    fn service(&mut self, deliver: &mut dyn FnMut(&str, &[u8])) {
        drain(deliver);
    }
}
