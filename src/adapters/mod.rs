//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                  |
//! |------------|--------------------|------------------------------|
//! | `hardware` | SensorPort         | ESP32 ADC, temp sensor       |
//! |            | ActuatorPort       | ESP32 LEDC PWM               |
//! | `log_sink` | EventSink          | Serial log output            |
//! | `csv_log`  | EventSink          | events.csv / soil.csv        |
//! | `console`  | (command source)   | UART console lines           |
//! | `storage`  | StoragePort        | NVS / in-memory store        |
//! | `persist`  | ConfigPort         | any StoragePort              |
//! |            | HistoryPort        |                              |
//! | `time`     |                    | ESP32 system timer           |

pub mod console;
pub mod csv_log;
pub mod hardware;
pub mod log_sink;
pub mod persist;
pub mod storage;
pub mod time;
