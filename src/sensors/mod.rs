//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns every sensor driver and produces a [`SensorSample`] each
//! tick for the control loop.

pub mod soil;
pub mod temperature;

use soil::SoilSensor;
use temperature::ChipTemperature;

/// One control-loop sample. Missing readings are `None`; the controller
/// decides what a missing reading means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorSample {
    pub soil_raw: Option<u16>,
    pub temp_tenths_c: Option<i16>,
    /// Control-loop busy ratio, 0–100.
    pub load_pct: u8,
}

/// Aggregates all sensor drivers and produces a unified sample.
pub struct SensorHub {
    pub soil: SoilSensor,
    pub temperature: ChipTemperature,
}

impl SensorHub {
    pub fn new(soil: SoilSensor, temperature: ChipTemperature) -> Self {
        Self { soil, temperature }
    }

    /// Read every sensor. `load_pct` comes from the
    /// [`LoadMeter`](crate::diagnostics::LoadMeter) in the main loop.
    pub fn read_all(&mut self, load_pct: u8) -> SensorSample {
        SensorSample {
            soil_raw: self.soil.read(),
            temp_tenths_c: self.temperature.read_tenths(),
            load_pct,
        }
    }
}
