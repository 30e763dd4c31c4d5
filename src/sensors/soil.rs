//! Capacitive soil-moisture probe on ADC1.
//!
//! Each read takes a burst of oneshot conversions and averages the
//! successful ones. A mean pinned at either rail means the probe is
//! unplugged or shorted and is reported as "no reading" rather than as
//! bone-dry or soaking-wet soil.

use log::warn;

use crate::config::{SOIL_RAIL_HIGH, SOIL_RAIL_LOW};
use crate::drivers::hw_init;
use crate::error::SensorError;

/// Conversions averaged per read.
pub const DEFAULT_OVERSAMPLE: usize = 8;

pub struct SoilSensor {
    channel: u32,
    oversample: usize,
    /// Consecutive failed reads, for log throttling.
    failures: u32,
}

impl SoilSensor {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            oversample: DEFAULT_OVERSAMPLE,
            failures: 0,
        }
    }

    pub fn with_oversample(mut self, n: usize) -> Self {
        self.oversample = n.max(1);
        self
    }

    /// Conditioned raw reading, `None` when the probe is unusable.
    pub fn read(&mut self) -> Option<u16> {
        let mut buf = [0u16; 32];
        let n = self.oversample.min(buf.len());
        let mut ok = 0;
        for _ in 0..n {
            if let Ok(raw) = hw_init::adc1_read(self.channel) {
                buf[ok] = raw;
                ok += 1;
            }
        }

        match condition(&buf[..ok]) {
            Ok(v) => {
                self.failures = 0;
                Some(v)
            }
            Err(e) => {
                self.failures += 1;
                // First failure and then every 60th, to keep the log readable.
                if self.failures % 60 == 1 {
                    warn!("soil: {} (x{})", e, self.failures);
                }
                None
            }
        }
    }
}

/// Average a burst of conversions, rejecting empty bursts and rail values.
pub fn condition(samples: &[u16]) -> Result<u16, SensorError> {
    if samples.is_empty() {
        return Err(SensorError::AdcReadFailed);
    }
    let sum: u32 = samples.iter().map(|&s| u32::from(s)).sum();
    let mean = (sum / samples.len() as u32) as u16;
    if mean == SOIL_RAIL_LOW || mean >= SOIL_RAIL_HIGH {
        return Err(SensorError::Railed);
    }
    Ok(mean)
}
