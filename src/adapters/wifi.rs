//! WiFi station-mode adapter.
//!
//! Implements [`NetworkPort`], the hexagonal boundary for network
//! connectivity. One `connect()` is one bounded association attempt; the
//! retry cadence and the give-up policy belong to the
//! [`SessionManager`](crate::session::SessionManager).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.

use core::net::Ipv4Addr;

use log::{error, info};

use crate::app::ports::{NetworkError, NetworkPort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), NetworkError> {
    if ssid.is_empty() || ssid.len() > 32 {
        return Err(NetworkError::InvalidSsid);
    }
    if !is_printable_ascii(ssid) {
        return Err(NetworkError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), NetworkError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(NetworkError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    driver: BlockingWifi<EspWifi<'static>>,
    #[cfg(target_os = "espidf")]
    configured: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_connected: bool,
    /// Simulation: counts platform_connect() calls.
    #[cfg(not(target_os = "espidf"))]
    sim_connect_counter: u32,
    /// Simulation: association attempts left to fail.
    #[cfg(not(target_os = "espidf"))]
    sim_fail_next: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(driver: BlockingWifi<EspWifi<'static>>) -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            driver,
            configured: false,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            sim_connected: false,
            sim_connect_counter: 0,
            sim_fail_next: 0,
        }
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| NetworkError::InvalidSsid)?;
        self.password.clear();
        self.password.push_str(password).map_err(|_| NetworkError::InvalidPassword)?;
        #[cfg(target_os = "espidf")]
        {
            self.configured = false;
        }
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), NetworkError> {
        if !self.configured {
            let auth_method = if self.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPAWPA2Personal
            };
            let conf = Configuration::Client(ClientConfiguration {
                ssid: self.ssid.as_str().try_into().map_err(|_| NetworkError::InvalidSsid)?,
                password: self.password.as_str().try_into().map_err(|_| NetworkError::InvalidPassword)?,
                auth_method,
                ..Default::default()
            });
            self.driver.set_configuration(&conf).map_err(|e| {
                error!("WiFi: set_configuration failed: {e}");
                NetworkError::ConnectionFailed
            })?;
            self.driver.start().map_err(|e| {
                error!("WiFi: start failed: {e}");
                NetworkError::ConnectionFailed
            })?;
            self.configured = true;
        }

        let attempt = self.driver.connect().and_then(|()| self.driver.wait_netif_up());
        if let Err(e) = attempt {
            let _ = self.driver.disconnect();
            error!("WiFi: association failed: {e}");
            return Err(NetworkError::ConnectionFailed);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), NetworkError> {
        self.sim_connect_counter = self.sim_connect_counter.wrapping_add(1);
        if self.sim_fail_next > 0 {
            self.sim_fail_next -= 1;
            return Err(NetworkError::ConnectionFailed);
        }
        self.sim_connected = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.driver.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_connected
    }

    #[cfg(target_os = "espidf")]
    fn platform_ip(&self) -> Option<Ipv4Addr> {
        self.driver.wifi().sta_netif().get_ip_info().ok().map(|info| info.ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_ip(&self) -> Option<Ipv4Addr> {
        self.sim_connected.then_some(Ipv4Addr::new(192, 168, 0, 61))
    }

    // ── Simulation controls ───────────────────────────────────

    /// Simulation: drop the link and fail the next `n` associations.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop(&mut self, fail_next: u32) {
        self.sim_connected = false;
        self.sim_fail_next = fail_next;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_connect_count(&self) -> u32 {
        self.sim_connect_counter
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// NetworkPort
// ───────────────────────────────────────────────────────────────

impl NetworkPort for WifiAdapter {
    fn connect(&mut self) -> Result<(), NetworkError> {
        if self.ssid.is_empty() {
            return Err(NetworkError::NoCredentials);
        }
        if self.platform_is_connected() {
            return Ok(());
        }

        info!("WiFi: connecting to '{}'", self.ssid);
        self.platform_connect()?;
        info!("WiFi: connected, IP: {:?}", self.platform_ip());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        if !self.platform_is_connected() {
            return None;
        }
        self.platform_ip()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
