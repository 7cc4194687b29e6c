//! Single status LED behind a polarity setting.
//!
//! Callers speak in logical terms (`on` = lit); the polarity maps that to a
//! pin level at this boundary only. Shared by the motion indication, the
//! heartbeat pulse and the pre-alert blinker, each borrowing it per tick.
//!
//! ## Dual-target design
//!
//! Generic over `embedded-hal` 1.0 `StatefulOutputPin`: the firmware passes
//! an [`GpioOutput`](crate::adapters::hardware::GpioOutput), tests pass a
//! recording double.

use embedded_hal::digital::{PinState, StatefulOutputPin};
use log::warn;

use crate::config::IndicatorPolarity;

pub struct Indicator<P> {
    pin: P,
    polarity: IndicatorPolarity,
}

impl<P: StatefulOutputPin> Indicator<P> {
    pub fn new(pin: P, polarity: IndicatorPolarity) -> Self {
        Self { pin, polarity }
    }

    fn level_for(&self, on: bool) -> PinState {
        match (self.polarity, on) {
            (IndicatorPolarity::ActiveHigh, true) | (IndicatorPolarity::ActiveLow, false) => PinState::High,
            (IndicatorPolarity::ActiveHigh, false) | (IndicatorPolarity::ActiveLow, true) => PinState::Low,
        }
    }

    /// Drive the LED lit (`true`) or dark (`false`).
    pub fn set(&mut self, on: bool) {
        let level = self.level_for(on);
        if let Err(e) = self.pin.set_state(level) {
            warn!("indicator: pin write failed: {:?}", e);
        }
    }

    pub fn off(&mut self) {
        self.set(false);
    }

    /// Whether the LED is currently lit, read back from the output latch.
    pub fn is_on(&mut self) -> bool {
        match self.pin.is_set_high() {
            Ok(high) => high == (self.polarity == IndicatorPolarity::ActiveHigh),
            Err(e) => {
                warn!("indicator: pin read-back failed: {:?}", e);
                false
            }
        }
    }

    /// Invert the current output level. Polarity-independent.
    pub fn toggle(&mut self) {
        if let Err(e) = self.pin.toggle() {
            warn!("indicator: pin toggle failed: {:?}", e);
        }
    }

    /// Borrow the underlying pin (tests inspect the raw level).
    pub fn pin_mut(&mut self) -> &mut P {
        &mut self.pin
    }
}
