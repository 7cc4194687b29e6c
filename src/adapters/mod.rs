//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                       | Connects to              |
//! |-------------|----------------------------------|--------------------------|
//! | `device_id` | (none)                           | eFuse factory MAC        |
//! | `hardware`  | InputPin / StatefulOutputPin     | ESP32 GPIO               |
//! | `log_sink`  | EventSink                        | Serial log output        |
//! | `mqtt`      | SessionPort                      | ESP-IDF MQTT client      |
//! | `time`      | Clock, DelayNs                   | ESP32 system timer       |
//! | `wifi`      | NetworkPort                      | ESP-IDF WiFi STA         |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod wifi;
