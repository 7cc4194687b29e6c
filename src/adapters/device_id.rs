//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable device ID in the form `PIR-XXYYZZ` (last 3 bytes of
//! the 6-byte MAC in uppercase hex). It is used as the MQTT client id and
//! the `device` field of every payload when `NodeConfig::device_id` is
//! left empty. [`hostname`] gives the matching lowercase station name.

use core::fmt::Write;

/// Device ID string; holds any id `NodeConfig::device_id` accepts.
pub type DeviceIdString = crate::config::ShortString;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Format: `PIR-XXYYZZ` (e.g., `PIR-EFCAFE`).
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    let _ = write!(id, "PIR-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// Format: `pirnode-xxyyzz` (lowercase).
pub fn hostname(mac: &MacAddress) -> heapless::String<24> {
    let mut name = heapless::String::<24>::new();
    let _ = write!(name, "pirnode-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}

/// The configured id if set, else the MAC-derived one.
pub fn resolve(configured: &str) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    if !configured.is_empty() && id.push_str(configured).is_ok() {
        return id;
    }
    device_id(&read_mac())
}
