//! PIR motion sensor signal conditioning.
//!
//! Cheap PIR modules (HC-SR501, AM312) misbehave in two distinct ways, and
//! the debouncer runs one timer against each:
//!
//! | Failure mode                              | Guard                           |
//! |-------------------------------------------|---------------------------------|
//! | Electrical bounce on a single transition  | `edge_debounce_ms` spacing      |
//! | Retrigger / HIGH-LOW-HIGH oscillation     | `need_low_ms` + `allow_next_true` |
//!
//! On top of both, every reading in the first `warmup_ms` after boot is
//! discarded: the module output is garbage while its pyroelectric element
//! settles.
//!
//! ## Algorithm (per `poll`)
//!
//! 1. Warmup gate.
//! 2. Read the raw level.
//! 3. LOW-run tracking: remember when the current LOW run began; once it
//!    reaches `need_low_ms`, arm `allow_next_true`.
//! 4. Edge = level differs from the last *qualified* level and more than
//!    `edge_debounce_ms` passed since the last *qualified* edge.
//! 5. A rising edge is confirmed only if armed, and disarms the flag.
//!    Falling edges are always confirmed.

use embedded_hal::digital::InputPin;
use log::{debug, warn};

use crate::config::NodeConfig;

/// Immutable sensor tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PirConfig {
    /// Logical pin number; informational only, the pin itself is injected.
    pub pin: i32,
    pub warmup_ms: u32,
    pub edge_debounce_ms: u32,
    pub need_low_ms: u32,
}

impl From<&NodeConfig> for PirConfig {
    fn from(c: &NodeConfig) -> Self {
        Self {
            pin: c.pir_pin,
            warmup_ms: c.warmup_ms,
            edge_debounce_ms: c.edge_debounce_ms,
            need_low_ms: c.need_low_ms,
        }
    }
}

/// Mutable debouncer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PirState {
    /// Level as of the last qualified edge.
    pub last_level: bool,
    pub last_edge_ms: u32,
    /// Start of the current uninterrupted LOW run; `None` after a HIGH.
    pub low_since_ms: Option<u32>,
    pub allow_next_true: bool,
    pub boot_ms: u32,
}

impl PirState {
    fn new(cfg: &PirConfig, boot_ms: u32) -> Self {
        Self {
            last_level: false,
            // One tick past the debounce window so the first transition after
            // warmup is never spacing-rejected, wherever the clock started.
            last_edge_ms: boot_ms.wrapping_sub(cfg.edge_debounce_ms).wrapping_sub(1),
            low_since_ms: None,
            allow_next_true: true,
            boot_ms,
        }
    }
}

/// Result of one `poll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PirSample {
    /// The pin was actually read (false during warmup).
    pub sampled: bool,
    /// Raw level read this tick (false when not sampled).
    pub level: bool,
    /// A qualified transition happened.
    pub is_edge: bool,
    /// The qualified transition is motion-start.
    pub rising: bool,
    /// A HIGH passed debounce spacing but was demoted for lack of a fresh
    /// LOW run.
    pub suppressed: bool,
}

impl PirSample {
    /// Qualified motion-end.
    pub fn falling(&self) -> bool {
        self.is_edge && !self.rising
    }
}

/// Warmup-gated, two-timer PIR debouncer over any `embedded-hal` input.
pub struct PirDebouncer<P> {
    pin: P,
    cfg: PirConfig,
    state: PirState,
}

impl<P: InputPin> PirDebouncer<P> {
    /// Start the debouncer; `boot_ms` begins the warmup window.
    pub fn new(pin: P, cfg: PirConfig, boot_ms: u32) -> Self {
        Self {
            pin,
            state: PirState::new(&cfg, boot_ms),
            cfg,
        }
    }

    pub fn state(&self) -> &PirState {
        &self.state
    }

    /// Milliseconds of warmup left at `now` (0 once sampling).
    pub fn warmup_remaining(&self, now: u32) -> u32 {
        self.cfg
            .warmup_ms
            .saturating_sub(now.wrapping_sub(self.state.boot_ms))
    }

    /// Sample the sensor and run the qualification state machine.
    pub fn poll(&mut self, now: u32) -> PirSample {
        let st = &mut self.state;

        if now.wrapping_sub(st.boot_ms) < self.cfg.warmup_ms {
            return PirSample::default();
        }

        let level = match self.pin.is_high() {
            Ok(level) => level,
            Err(e) => {
                warn!("PIR: read failed on GPIO{}: {:?}", self.cfg.pin, e);
                return PirSample::default();
            }
        };

        if level {
            st.low_since_ms = None;
        } else {
            let since = *st.low_since_ms.get_or_insert(now);
            if now.wrapping_sub(since) >= self.cfg.need_low_ms {
                st.allow_next_true = true;
            }
        }

        let mut is_edge = level != st.last_level
            && now.wrapping_sub(st.last_edge_ms) > self.cfg.edge_debounce_ms;
        let mut rising = is_edge && level;
        let mut suppressed = false;

        if is_edge {
            st.last_edge_ms = now;
            if rising {
                if st.allow_next_true {
                    st.allow_next_true = false;
                } else {
                    debug!("PIR: HIGH ignored (waiting stable LOW)");
                    is_edge = false;
                    rising = false;
                    suppressed = true;
                }
            }
            st.last_level = level;
        }

        PirSample {
            sampled: true,
            level,
            is_edge,
            rising,
            suppressed,
        }
    }
}
