//! Soft-start ramp profile.
//!
//! A ramp is a bounded sequence of linear duty steps from 0 up to the
//! target. The driver walks the steps with a delay between each; the
//! profile itself is pure so it can be checked on the host.

/// Upper bound on steps in one ramp.
pub const MAX_RAMP_STEPS: u32 = 20;

/// One point on the ramp: `duty` is applied `at_ms` after the ramp starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampStep {
    pub at_ms: u32,
    pub duty: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftRamp {
    target: u8,
    duration_ms: u32,
    steps: u32,
}

impl SoftRamp {
    pub fn new(target: u8, duration_ms: u32) -> Self {
        // Never more steps than distinct duty values.
        let steps = MAX_RAMP_STEPS.min(u32::from(target)).max(1);
        Self {
            target,
            duration_ms,
            steps,
        }
    }

    pub const fn target(&self) -> u8 {
        self.target
    }

    pub const fn step_count(&self) -> u32 {
        self.steps
    }

    /// Delay between consecutive steps.
    pub const fn step_interval_ms(&self) -> u32 {
        self.duration_ms / self.steps
    }

    /// Linear duty at `elapsed_ms` into the ramp, saturating at the target.
    pub fn duty_at(&self, elapsed_ms: u32) -> u8 {
        if self.duration_ms == 0 || elapsed_ms >= self.duration_ms {
            return self.target;
        }
        (u64::from(self.target) * u64::from(elapsed_ms) / u64::from(self.duration_ms)) as u8
    }

    /// The steps to apply, in order. The last step is always the target.
    pub fn steps(&self) -> impl Iterator<Item = RampStep> + Clone + '_ {
        (1..=self.steps).map(move |i| RampStep {
            at_ms: (u64::from(self.duration_ms) * u64::from(i) / u64::from(self.steps)) as u32,
            duty: (u32::from(self.target) * i / self.steps) as u8,
        })
    }
}
