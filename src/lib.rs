//! PirNode firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod scheduler;
pub mod sensors;
pub mod session;

#[cfg(target_os = "espidf")]
mod esp_link_shims;

// Host tests need a critical-section implementation for the MQTT inbox.
#[cfg(all(test, not(target_os = "espidf")))]
use critical_section as _;
