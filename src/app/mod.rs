//! Application core: pure domain logic, zero platform I/O.
//!
//! This module contains the business rules for the motion node: edge
//! reporting, heartbeats, boot announcement and pre-alert command handling.
//! All interaction with the network happens through **port traits** defined
//! in [`ports`]; pins come in as `embedded-hal` traits. The whole layer is
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod messages;
pub mod ports;
pub mod reporter;
pub mod service;
