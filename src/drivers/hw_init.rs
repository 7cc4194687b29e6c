//! One-shot GPIO initialization and raw level access.
//!
//! Configures the PIR input and indicator output using raw ESP-IDF sys
//! calls. Called once from `main()` before the loop starts. On host builds
//! every function is a simulation stub.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed { pin: i32, rc: i32 },
    /// No such pad on the SoC.
    InvalidPin(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed { pin, rc } => write!(f, "GPIO{} config failed (rc={})", pin, rc),
            Self::InvalidPin(pin) => write!(f, "GPIO{} does not exist", pin),
        }
    }
}

/// `gpio_config_t::pin_bit_mask` for one pad.
pub fn pin_mask(pin: i32) -> Result<u64, HwInitError> {
    if !crate::pins::is_valid_gpio(pin) {
        return Err(HwInitError::InvalidPin(pin));
    }
    Ok(1u64 << pin)
}

#[cfg(target_os = "espidf")]
pub fn init_gpio(pir_pin: i32, led_pin: i32) -> Result<(), HwInitError> {
    // PIR modules drive their output push-pull; no pull resistor.
    let pir_cfg = gpio_config_t {
        pin_bit_mask: pin_mask(pir_pin)?,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: called once from main() before the loop; single-threaded.
    let ret = unsafe { gpio_config(&pir_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed { pin: pir_pin, rc: ret });
    }

    let led_cfg = gpio_config_t {
        pin_bit_mask: pin_mask(led_pin)?,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&led_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed { pin: led_pin, rc: ret });
    }

    info!("hw_init: GPIO{} PIR input, GPIO{} LED output", pir_pin, led_pin);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_gpio(pir_pin: i32, led_pin: i32) -> Result<(), HwInitError> {
    pin_mask(pir_pin)?;
    pin_mask(led_pin)?;
    log::info!("hw_init(sim): GPIO{} / GPIO{} init skipped", pir_pin, led_pin);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Simulated pad levels, indexed by GPIO number.
#[cfg(not(target_os = "espidf"))]
static SIM_LEVELS: [core::sync::atomic::AtomicBool; SIM_PINS] =
    [const { core::sync::atomic::AtomicBool::new(false) }; SIM_PINS];

#[cfg(not(target_os = "espidf"))]
const SIM_PINS: usize = crate::pins::MAX_GPIO as usize + 1;

#[cfg(not(target_os = "espidf"))]
fn sim_pad(pin: i32) -> Option<&'static core::sync::atomic::AtomicBool> {
    usize::try_from(pin).ok().and_then(|i| SIM_LEVELS.get(i))
}

/// Simulation: drive an input pad (e.g. the PIR output).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_level(pin: i32, high: bool) {
    if let Some(pad) = sim_pad(pin) {
        pad.store(high, core::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    sim_pad(pin).is_some_and(|pad| pad.load(core::sync::atomic::Ordering::Relaxed))
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_gpio(). Main-loop only.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    sim_set_level(pin, high);
}
