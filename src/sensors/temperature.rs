//! ESP32-S3 on-die temperature sensor.
//!
//! Reported in tenths of a degree so it fits the `i16` history array.
//! The die runs warmer than ambient; the value is a board-health
//! indicator, not an air temperature.

use crate::drivers::hw_init;

/// Plausible die range; anything outside is treated as a bad read.
const MIN_C: f32 = -40.0;
const MAX_C: f32 = 125.0;

#[derive(Default)]
pub struct ChipTemperature;

impl ChipTemperature {
    pub fn new() -> Self {
        Self
    }

    /// Current die temperature in tenths of °C.
    pub fn read_tenths(&self) -> Option<i16> {
        hw_init::chip_temp_celsius().ok().and_then(to_tenths)
    }
}

pub fn to_tenths(celsius: f32) -> Option<i16> {
    if !(MIN_C..=MAX_C).contains(&celsius) {
        return None;
    }
    Some((celsius * 10.0).round() as i16)
}
