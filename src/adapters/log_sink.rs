//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (the ESP-IDF logger on the device, which goes to
//! UART / USB-CDC).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, ts_ms: u32, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "SOIL | t={} | soil={:?} | T={:?} | load={}% | pump={} lockout={} | on_window={}ms",
                    ts_ms,
                    t.soil,
                    t.temp_tenths_c.map(|v| f32::from(v) / 10.0),
                    t.load_pct,
                    if t.pump_on { "ON" } else { "OFF" },
                    t.lockout,
                    t.on_time_window_ms,
                );
            }
            AppEvent::LockoutEnter { .. } => {
                warn!("{} | t={} | {}", event.name(), ts_ms, event.detail());
            }
            _ => {
                info!("{} | t={} | {}", event.name(), ts_ms, event.detail());
            }
        }
    }
}
