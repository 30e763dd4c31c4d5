//! Runtime diagnostics.
//!
//! [`LoadMeter`] tracks how much of each control period the loop spends
//! working instead of sleeping. It feeds the `load_pct` history series
//! in place of a FreeRTOS idle-task CPU gauge, which needs run-time
//! stats compiled into the IDF.

/// Exponential moving average weight, as a right shift (1/8).
const EMA_SHIFT: u32 = 3;

/// Smoothed control-loop busy ratio.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadMeter {
    /// Percent in 8.8 fixed point.
    avg_q8: u32,
    primed: bool,
}

impl LoadMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one period's busy time and return the smoothed load (0–100).
    pub fn record(&mut self, busy_ms: u32, period_ms: u32) -> u8 {
        let pct = if period_ms == 0 {
            100
        } else {
            (u64::from(busy_ms) * 100 / u64::from(period_ms)).min(100) as u32
        };
        let sample_q8 = pct << 8;

        if self.primed {
            // avg += (sample - avg) / 8, in signed space.
            let delta = sample_q8 as i64 - self.avg_q8 as i64;
            self.avg_q8 = (self.avg_q8 as i64 + (delta >> EMA_SHIFT)) as u32;
        } else {
            self.avg_q8 = sample_q8;
            self.primed = true;
        }
        self.load_pct()
    }

    pub fn load_pct(&self) -> u8 {
        ((self.avg_q8 + 128) >> 8).min(100) as u8
    }
}
