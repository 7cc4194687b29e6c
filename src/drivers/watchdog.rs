//! Task watchdog (TWDT) and device restart.
//!
//! The tick loop feeds the watchdog once per pass; a pass that wedges for
//! longer than `watchdog_timeout_ms` panics the SoC into a reboot. Fatal
//! errors take the explicit [`restart`] path instead.

use log::{info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    esp_restart, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure, esp_task_wdt_reset,
    ESP_OK,
};

pub struct Watchdog {
    timeout_ms: u32,
    subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_feeds: core::cell::Cell<u32>,
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new(timeout_ms: u32) -> Self {
        let subscribed = subscribe_current_task(timeout_ms);
        if subscribed {
            info!("Watchdog: armed, {} ms timeout", timeout_ms);
        } else {
            warn!("Watchdog: not armed, main loop runs unsupervised");
        }
        Self {
            timeout_ms,
            subscribed,
            #[cfg(not(target_os = "espidf"))]
            sim_feeds: core::cell::Cell::new(0),
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn is_armed(&self) -> bool {
        self.subscribed
    }

    /// Reset the countdown. Called once per tick.
    pub fn feed(&self) {
        if !self.subscribed {
            return;
        }
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: the calling task was subscribed in `new`.
            unsafe {
                esp_task_wdt_reset();
            }
        }
        #[cfg(not(target_os = "espidf"))]
        {
            self.sim_feeds.set(self.sim_feeds.get().wrapping_add(1));
        }
    }

    /// Simulation: number of feeds so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_feeds(&self) -> u32 {
        self.sim_feeds.get()
    }
}

#[cfg(target_os = "espidf")]
fn subscribe_current_task(timeout_ms: u32) -> bool {
    let cfg = esp_task_wdt_config_t {
        timeout_ms,
        idle_core_mask: 0,
        trigger_panic: true,
    };
    // SAFETY: plain FFI calls on a stack config; a null handle means the
    // calling task.
    unsafe {
        let ret = esp_task_wdt_reconfigure(&cfg);
        if ret != ESP_OK {
            warn!("Watchdog: reconfigure returned {}", ret);
        }
        let ret = esp_task_wdt_add(core::ptr::null_mut());
        if ret != ESP_OK {
            warn!("Watchdog: subscribe returned {}", ret);
        }
        ret == ESP_OK
    }
}

#[cfg(not(target_os = "espidf"))]
fn subscribe_current_task(timeout_ms: u32) -> bool {
    timeout_ms > 0
}

/// Reboot the SoC. The only recovery path for fatal errors.
#[cfg(target_os = "espidf")]
pub fn restart() -> ! {
    log::error!("Restarting device");
    // SAFETY: esp_restart never returns; no Rust state needs unwinding.
    unsafe { esp_restart() }
}
