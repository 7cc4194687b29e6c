//! Hardware adapter: GPIO pads as `embedded-hal` 1.0 digital pins.
//!
//! The domain is generic over [`InputPin`] / [`StatefulOutputPin`]; these
//! are the production implementations. Both go through
//! [`hw_init`](crate::drivers::hw_init), which talks to ESP-IDF on the
//! device and to simulated pads on the host.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

use crate::drivers::hw_init;

/// A configured GPIO input (the PIR output line).
pub struct GpioInput {
    pin: i32,
}

impl GpioInput {
    /// The pad must already be configured by `hw_init::init_gpio`.
    pub fn new(pin: i32) -> Self {
        Self { pin }
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }
}

impl ErrorType for GpioInput {
    type Error = Infallible;
}

impl InputPin for GpioInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(hw_init::gpio_read(self.pin))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!hw_init::gpio_read(self.pin))
    }
}

/// A configured GPIO output (the indicator LED).
///
/// Output-only pads read back 0 on the ESP32, so the driven level is
/// latched here.
pub struct GpioOutput {
    pin: i32,
    high: bool,
}

impl GpioOutput {
    /// Drives the pad to `initial_high` immediately.
    pub fn new(pin: i32, initial_high: bool) -> Self {
        hw_init::gpio_write(pin, initial_high);
        Self { pin, high: initial_high }
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }
}

impl ErrorType for GpioOutput {
    type Error = Infallible;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.pin, false);
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.pin, true);
        self.high = true;
        Ok(())
    }
}

impl StatefulOutputPin for GpioOutput {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}
