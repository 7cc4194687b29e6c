//! Outbound application events.
//!
//! The [`MotionNode`](super::service::MotionNode) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  They are diagnostics for
//! the operator (serial log); broker traffic is published separately.

use core::net::Ipv4Addr;

use crate::error::{CommsError, FatalError, Rejected};

/// Why a pre-alert ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrealertEnd {
    Stopped,
    TimedOut,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Retained boot announcement went out.
    Booted { ip: Option<Ipv4Addr> },

    /// PIR still inside its warmup window.
    WarmingUp { remaining_ms: u32 },

    /// A qualified motion transition was reported.
    MotionChanged { motion: bool, at_ms: u32, published: bool },

    /// A HIGH passed debounce but arrived without a fresh LOW run.
    RisingSuppressed { at_ms: u32 },

    Heartbeat { uptime_ms: u32 },

    /// Session (re)connected and subscriptions were re-issued.
    SessionEstablished { reconnects: u32 },

    /// A connect attempt failed; another follows after the fixed delay.
    ReconnectFailed(CommsError),

    /// Unrecoverable; the device restarts after this.
    Fatal(FatalError),

    PrealertStarted { duration_ms: u32 },

    PrealertEnded(PrealertEnd),

    /// Inbound command discarded.
    CommandIgnored(Rejected),
}
