//! Unified error types for the PirNode firmware.
//!
//! Every failure in the node resolves into one of three outcomes:
//!
//! | Kind        | Meaning                                    | Handling              |
//! |-------------|--------------------------------------------|-----------------------|
//! | `Transient` | network / session failure                  | fixed-delay retry     |
//! | `Ignored`   | malformed or unknown inbound command       | dropped, no state     |
//! | `Fatal`     | Wi-Fi association exhausted                | device restart        |
//!
//! All variants are `Copy` so they can be returned from the tick path
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Recovered by retrying with the fixed reconnect delay.
    Transient(CommsError),
    /// Input was discarded without any state change.
    Ignored(Rejected),
    /// Only a restart recovers from this.
    Fatal(FatalError),
}

impl Error {
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(e) => write!(f, "transient: {e}"),
            Self::Ignored(e) => write!(f, "ignored: {e}"),
            Self::Fatal(e) => write!(f, "fatal: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Wi-Fi association attempt failed.
    WifiConnectFailed,
    /// Broker refused or timed out; carries the client state code.
    SessionConnectFailed(i32),
    /// Re-issuing a subscription after connect failed.
    SubscribeFailed,
    PublishFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::SessionConnectFailed(rc) => write!(f, "MQTT connect failed (rc={rc})"),
            Self::SubscribeFailed => write!(f, "MQTT subscribe failed"),
            Self::PublishFailed => write!(f, "MQTT publish failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Transient(e)
    }
}

// ---------------------------------------------------------------------------
// Rejected inbound input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// Payload is not JSON or lacks the `action` field.
    Malformed,
    /// `action` is neither `start` nor `stop`.
    UnknownAction,
    /// Message arrived on a topic nobody declared.
    Unrouted,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed payload"),
            Self::UnknownAction => write!(f, "unknown action"),
            Self::Unrouted => write!(f, "no handler for topic"),
        }
    }
}

impl From<Rejected> for Error {
    fn from(e: Rejected) -> Self {
        Self::Ignored(e)
    }
}

// ---------------------------------------------------------------------------
// Fatal conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalError {
    /// Consecutive Wi-Fi association failures reached the configured limit.
    WifiAssociationTimeout { attempts: u32 },
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiAssociationTimeout { attempts } => {
                write!(f, "WiFi association failed {attempts} times")
            }
        }
    }
}

impl From<FatalError> for Error {
    fn from(e: FatalError) -> Self {
        Self::Fatal(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
