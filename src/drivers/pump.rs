//! Pump motor driver (logic-level MOSFET on an LEDC PWM channel).
//!
//! Generic over `embedded-hal` [`SetDutyCycle`] and [`DelayNs`] so the same
//! driver runs against the LEDC channel on the device and against a
//! recording fake on the host.
//!
//! ## Safety contract
//!
//! This driver is a dumb actuator. Whether the pump may run at all is
//! decided by the controller's duty-cycle limiter.

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, warn};

use crate::control::ramp::SoftRamp;
use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Stopped,
    Running { duty: u8 },
}

pub struct PumpDriver<P, D> {
    pwm: P,
    delay: D,
    state: PumpState,
}

impl<P: SetDutyCycle, D: DelayNs> PumpDriver<P, D> {
    pub fn new(pwm: P, delay: D) -> Self {
        Self {
            pwm,
            delay,
            state: PumpState::Stopped,
        }
    }

    /// Drive straight to `duty` (0–255). Zero stops the pump.
    pub fn set(&mut self, duty: u8) -> Result<(), ActuatorError> {
        if duty == 0 {
            return self.stop();
        }
        self.write(duty)?;
        self.state = PumpState::Running { duty };
        Ok(())
    }

    /// Ramp linearly from 0 to `target` over `duration_ms`.
    ///
    /// Blocks for the ramp duration. On a write failure the pump is
    /// stopped and the error returned.
    pub fn ramp_to(&mut self, target: u8, duration_ms: u32) -> Result<(), ActuatorError> {
        if target == 0 {
            return self.stop();
        }
        let ramp = SoftRamp::new(target, duration_ms);
        debug!(
            "pump: ramp to {} over {}ms ({} steps)",
            target,
            duration_ms,
            ramp.step_count()
        );

        let interval = ramp.step_interval_ms();
        for step in ramp.steps() {
            if let Err(e) = self.write(step.duty) {
                let _ = self.stop();
                return Err(e);
            }
            self.state = PumpState::Running { duty: step.duty };
            self.delay.delay_ms(interval);
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        self.state = PumpState::Stopped;
        self.write(0)
    }

    fn write(&mut self, duty: u8) -> Result<(), ActuatorError> {
        self.pwm
            .set_duty_cycle_fraction(u16::from(duty), 255)
            .map_err(|e| {
                warn!("pump: PWM write failed: {:?}", e);
                ActuatorError::PwmWriteFailed
            })
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.state, PumpState::Stopped)
    }

    pub fn current_duty(&self) -> u8 {
        match self.state {
            PumpState::Stopped => 0,
            PumpState::Running { duty } => duty,
        }
    }

    /// Borrow the PWM channel (test inspection).
    pub fn pwm(&self) -> &P {
        &self.pwm
    }
}
