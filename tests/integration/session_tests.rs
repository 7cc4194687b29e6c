//! `SessionManager` lifecycle against mock network and broker.

use pirnode::app::ports::{CommandHandler, CommandKind, Publisher};
use pirnode::config::NodeConfig;
use pirnode::error::{CommsError, Error, Result};
use pirnode::session::{LinkState, SessionManager, SessionSettings, SessionStatus};

use super::mock_hw::{ManualClock, MockNetwork, MockSession};

const TOPIC: &str = "iot/eldercare/room1/cmd/prealert";

fn manager(network: MockNetwork, session: MockSession) -> SessionManager<MockNetwork, MockSession> {
    let cfg = NodeConfig::default();
    let mut m = SessionManager::new(network, session, SessionSettings::from_config(&cfg, "PIR-EFCAFE"));
    assert!(m.declare(TOPIC, CommandKind::Prealert));
    m
}

#[derive(Default)]
struct Collect(Vec<Vec<u8>>);

impl CommandHandler for Collect {
    fn handle(&mut self, _kind: CommandKind, payload: &[u8]) -> Result<()> {
        self.0.push(payload.to_vec());
        Ok(())
    }
}

#[test]
fn wait_connected_blocks_through_refusals() {
    let mut m = manager(MockNetwork::default(), MockSession { refuse_next: 3, ..Default::default() });
    let clock = ManualClock::at(1_000);
    let mut delay = clock.clone();

    assert_eq!(m.wait_connected(&clock, &mut delay), Ok(SessionStatus::Established));
    assert_eq!(m.session().connect_calls, 4);
    assert_eq!(m.network().connect_calls, 1, "transport stayed up");
    assert!(clock.0.get() >= 1_000 + 3 * 2_000);
    assert_eq!(m.session().subscribes, vec![TOPIC.to_string()]);
}

#[test]
fn repeated_drops_resubscribe_once_each() {
    let mut m = manager(MockNetwork::default(), MockSession::default());
    let mut now = 0;
    m.ensure_connected(now).unwrap();

    for _ in 0..5 {
        now += 1_000;
        m.session_mut().drop_link(0);
        assert_eq!(m.ensure_connected(now), Ok(SessionStatus::Established));
        for _ in 0..10 {
            now += 50;
            assert_eq!(m.ensure_connected(now), Ok(SessionStatus::Connected));
        }
    }

    assert_eq!(m.session().subscribes.len(), 6);
    assert_eq!(m.session().connect_calls, 6);
    assert_eq!(m.connects(), 6);
}

#[test]
fn transport_loss_reassociates_before_session() {
    let mut m = manager(MockNetwork::default(), MockSession::default());
    m.ensure_connected(0).unwrap();

    m.network_mut().up = false;
    m.network_mut().fail_next = 1;
    m.session_mut().up = false;
    assert_eq!(m.ensure_connected(100), Err(Error::Transient(CommsError::WifiConnectFailed)));
    assert_eq!(m.session().connect_calls, 1, "no session attempt without transport");
    assert_eq!(m.link_state(), LinkState::Backoff { attempt: 1, since_ms: 100 });

    assert_eq!(m.ensure_connected(2_100), Ok(SessionStatus::Established));
    assert_eq!(m.network().connect_calls, 3);
}

#[test]
fn publish_offline_never_touches_transport() {
    let mut m = manager(MockNetwork::default(), MockSession { refuse_next: 1, ..Default::default() });
    assert!(m.ensure_connected(0).is_err());
    assert!(!Publisher::is_connected(&m));
    assert!(!m.publish("iot/eldercare/room1/motion/state", b"{}", false));
    assert!(m.session().published.is_empty());
}

#[test]
fn inbound_messages_wait_while_disconnected() {
    let mut m = manager(MockNetwork::default(), MockSession { refuse_next: 1, ..Default::default() });
    m.session_mut().push(TOPIC, br#"{"action":"start"}"#);
    let mut sink = Collect::default();

    assert!(m.ensure_connected(0).is_err());
    m.service_tick(&mut sink);
    assert!(sink.0.is_empty());

    m.ensure_connected(2_000).unwrap();
    m.service_tick(&mut sink);
    assert_eq!(sink.0, vec![br#"{"action":"start"}"#.to_vec()]);
}

#[test]
fn retry_clock_survives_wrap() {
    let mut m = manager(MockNetwork::default(), MockSession { refuse_next: 1, ..Default::default() });
    let t0 = u32::MAX - 500;
    assert!(m.ensure_connected(t0).is_err());
    assert_eq!(m.ensure_connected(t0.wrapping_add(1_999)), Ok(SessionStatus::Reconnecting { attempt: 1 }));
    assert_eq!(m.ensure_connected(t0.wrapping_add(2_000)), Ok(SessionStatus::Established));
}
