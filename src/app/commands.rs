//! Inbound commands to the application service.
//!
//! The back-end rules engine publishes pre-alert commands on
//! `{prefix}/cmd/prealert`:
//!
//! ```json
//! {"action": "start", "reason": "INACTIVITY", "ttl_sec": 300}
//! {"action": "stop",  "reason": "INACTIVITY"}
//! ```
//!
//! Anything else is dropped with [`Rejected`], never surfaced further.

use serde::Deserialize;

use crate::error::{Rejected, Result};

/// Parsed pre-alert command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrealertCommand {
    /// Start (or restart) the pre-alert blink.
    /// `ttl_ms` is present only when the sender supplied `ttl_sec`.
    Start { ttl_ms: Option<u32> },
    Stop,
}

#[derive(Deserialize)]
struct RawPrealert {
    action: heapless::String<16>,
    #[serde(default)]
    ttl_sec: Option<u32>,
}

/// Decode a pre-alert payload.
pub fn parse_prealert(payload: &[u8]) -> Result<PrealertCommand> {
    let raw: RawPrealert = serde_json::from_slice(payload).map_err(|_| Rejected::Malformed)?;
    match raw.action.as_str() {
        "start" => Ok(PrealertCommand::Start {
            ttl_ms: raw.ttl_sec.map(|s| s.saturating_mul(1000)),
        }),
        "stop" => Ok(PrealertCommand::Stop),
        _ => Err(Rejected::UnknownAction.into()),
    }
}
