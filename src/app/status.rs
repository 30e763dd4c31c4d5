//! Read-only status snapshot.
//!
//! Built by [`AppService::status`](super::service::AppService::status) and
//! serialised to JSON for whatever front end reads it. Field names are
//! part of the external contract.

use serde::Serialize;

use crate::config::{PumpConfig, PumpMode};
use crate::control::pump::{PumpState, Runtime};
use crate::history::HistoryRecorder;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub soil: Option<u16>,
    /// Degrees Celsius, `null` when the sensor is unavailable.
    pub temp_c: Option<f32>,
    pub load_pct: u8,
    pub pump_on: bool,
    pub lockout: bool,
    pub state: PumpState,
    pub mode: PumpMode,
    pub window_sec: u32,
    pub max_on_sec_window: u32,
    pub on_time_window_ms: u32,
    pub uptime_ms: u32,

    // Oldest first.
    pub hist_soil: Vec<u16>,
    pub hist_temp: Vec<Option<f32>>,
    pub hist_load: Vec<u8>,
}

impl StatusSnapshot {
    pub fn build<const N: usize>(
        config: &PumpConfig,
        runtime: &Runtime,
        history: &HistoryRecorder<N>,
        now_ms: u32,
    ) -> Self {
        let samples = history.iter();
        Self {
            soil: runtime.soil_now,
            temp_c: runtime.temp_tenths_c.map(tenths_to_c),
            load_pct: runtime.load_pct,
            pump_on: runtime.pump_on,
            lockout: runtime.lockout,
            state: runtime.state(),
            mode: config.mode,
            window_sec: config.limit_window_sec,
            max_on_sec_window: config.max_on_sec_in_window,
            on_time_window_ms: runtime.on_time_this_window_ms,
            uptime_ms: now_ms,
            hist_soil: samples.clone().map(|s| s.soil).collect(),
            hist_temp: samples
                .clone()
                .map(|s| s.temp_tenths_c.map(tenths_to_c))
                .collect(),
            hist_load: samples.map(|s| s.load_pct).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn tenths_to_c(t: i16) -> f32 {
    f32::from(t) / 10.0
}
