//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements              | Connects to                 |
//! |-------------|-------------------------|-----------------------------|
//! | `board`     | all device ports        | composition of the below    |
//! | `hardware`  | SensorPort, ActuatorPort| relay, ranger, switch, LED  |
//! | `wifi`      | (NetworkPort side)      | ESP-IDF Wi-Fi AP/STA, mDNS  |
//! | `notifier`  | (NotifierPort side)     | webhook, MQTT broker        |
//! | `time`      | (TimeSourcePort side)   | ESP32 timer, SNTP           |
//! | `nvs`       | ConfigPort              | NVS / in-memory store       |
//! | `event_log` | EventLogPort            | RAM ring buffer             |
//! | `log_sink`  | EventSink               | Serial log output           |
//! | `device_id` |:                       | eFuse MAC                   |

pub mod board;
pub mod device_id;
pub mod event_log;
pub mod hardware;
pub mod log_sink;
pub mod notifier;
pub mod nvs;
pub mod time;
pub mod wifi;
