//! Remote-triggered pre-alert blinker.
//!
//! The back-end sends `start` when a room has been quiet for most of its
//! inactivity window, giving the occupant a visible cue before an alert
//! escalates. The node blinks its indicator until `stop`, or until the
//! fixed duration runs out.
//!
//! ```text
//!        start                       start (resets deadline)
//!  IDLE ────────▶ ACTIVE ◀───────────────┐
//!   ▲               │ └──────────────────┘
//!   └───────────────┘ stop / elapsed > duration
//! ```
//!
//! While active the LED is toggled every `blink_period_ms`. Leaving ACTIVE
//! always leaves the LED dark.

use embedded_hal::digital::StatefulOutputPin;
use log::info;

use crate::app::events::PrealertEnd;
use crate::drivers::indicator::Indicator;

/// Blinker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrealertState {
    pub active: bool,
    pub started_ms: u32,
    /// `started_ms + duration`, wrapping. Informational; expiry is computed
    /// from elapsed time so it survives clock wrap.
    pub end_ms: u32,
    pub last_toggle_ms: u32,
    pub led_on: bool,
    duration_ms: u32,
}

pub struct PrealertBlinker {
    default_duration_ms: u32,
    blink_period_ms: u32,
    state: PrealertState,
}

impl PrealertBlinker {
    pub fn new(default_duration_ms: u32, blink_period_ms: u32) -> Self {
        Self {
            default_duration_ms,
            blink_period_ms,
            state: PrealertState::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn state(&self) -> &PrealertState {
        &self.state
    }

    /// Enter (or re-arm) ACTIVE. `duration_ms` overrides the default.
    /// Returns the duration in effect.
    pub fn start<P: StatefulOutputPin>(
        &mut self,
        now: u32,
        duration_ms: Option<u32>,
        led: &mut Indicator<P>,
    ) -> u32 {
        let duration = duration_ms.unwrap_or(self.default_duration_ms);
        let st = &mut self.state;
        st.started_ms = now;
        st.duration_ms = duration;
        st.end_ms = now.wrapping_add(duration);

        if !st.active {
            st.active = true;
            st.last_toggle_ms = now;
            led.set(true);
            st.led_on = true;
            info!("Prealert: start ({} ms)", duration);
        } else {
            info!("Prealert: deadline reset ({} ms)", duration);
        }
        duration
    }

    /// Leave ACTIVE from any state; the LED ends dark.
    pub fn stop<P: StatefulOutputPin>(&mut self, led: &mut Indicator<P>) -> bool {
        let was_active = self.state.active;
        self.deactivate(led);
        if was_active {
            info!("Prealert: stop");
        }
        was_active
    }

    /// Per-tick service: expire or toggle. Returns `Some` when it expired.
    pub fn update<P: StatefulOutputPin>(&mut self, now: u32, led: &mut Indicator<P>) -> Option<PrealertEnd> {
        if !self.state.active {
            return None;
        }
        if now.wrapping_sub(self.state.started_ms) > self.state.duration_ms {
            self.deactivate(led);
            info!("Prealert: timed out");
            return Some(PrealertEnd::TimedOut);
        }
        if now.wrapping_sub(self.state.last_toggle_ms) >= self.blink_period_ms {
            led.toggle();
            self.state.led_on = led.is_on();
            self.state.last_toggle_ms = now;
        }
        None
    }

    fn deactivate<P: StatefulOutputPin>(&mut self, led: &mut Indicator<P>) {
        self.state.active = false;
        self.state.led_on = false;
        led.off();
    }
}
