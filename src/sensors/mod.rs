//! Sensor front-ends.
//!
//! Each sensor owns its pin through an `embedded-hal` trait and turns raw
//! readings into qualified domain signals. No sensor touches the network.

pub mod pir;
