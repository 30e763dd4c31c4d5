//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and the pump driver, exposing them through
//! [`SensorPort`] and [`ActuatorPort`]. This is the only module in the
//! system that touches actual hardware. On non-espidf targets the
//! underlying drivers use cfg-gated simulation stubs.

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::SetDutyCycle;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::pump::PumpDriver;
use crate::error::ActuatorError;
use crate::sensors::{SensorHub, SensorSample};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<P, D> {
    sensor_hub: SensorHub,
    pump: PumpDriver<P, D>,
    /// Latest value from the main loop's load meter.
    load_pct: u8,
}

impl<P: SetDutyCycle, D: DelayNs> HardwareAdapter<P, D> {
    pub fn new(sensor_hub: SensorHub, pump: PumpDriver<P, D>) -> Self {
        Self {
            sensor_hub,
            pump,
            load_pct: 0,
        }
    }

    /// Publish the loop load for the next sample.
    pub fn set_load_pct(&mut self, pct: u8) {
        self.load_pct = pct.min(100);
    }

    pub fn pump(&self) -> &PumpDriver<P, D> {
        &self.pump
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<P: SetDutyCycle, D: DelayNs> SensorPort for HardwareAdapter<P, D> {
    fn sample(&mut self) -> SensorSample {
        self.sensor_hub.read_all(self.load_pct)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<P: SetDutyCycle, D: DelayNs> ActuatorPort for HardwareAdapter<P, D> {
    fn drive_pump(&mut self, pwm: u8) -> Result<(), ActuatorError> {
        self.pump.set(pwm)
    }

    fn ramp_pump(&mut self, target: u8, duration_ms: u32) -> Result<(), ActuatorError> {
        self.pump.ramp_to(target, duration_ms)
    }

    fn stop_pump(&mut self) -> Result<(), ActuatorError> {
        self.pump.stop()
    }
}
