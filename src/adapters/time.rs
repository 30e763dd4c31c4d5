//! Millisecond clock adapter.
//!
//! The control loop runs on a wrapping `u32` millisecond counter
//! (~49.7 days per wrap). All comparisons go through
//! [`elapsed_ms`](crate::control::elapsed_ms).
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.

pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    /// Added to every reading; lets the simulation start near a wrap.
    offset_ms: u32,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            offset_ms: 0,
        }
    }

    /// Start the counter at `offset_ms` instead of zero.
    pub fn with_offset(mut self, offset_ms: u32) -> Self {
        self.offset_ms = offset_ms;
        self
    }

    /// Milliseconds since boot, truncated to `u32` (wraps).
    pub fn now_ms(&self) -> u32 {
        (self.uptime_us() / 1_000) as u32
    }

    /// Microseconds since boot.
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: esp_timer_get_time is a read of the monotonic system timer.
        let us = (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64;
        us.wrapping_add(u64::from(self.offset_ms) * 1_000)
    }

    /// Microseconds since boot.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        (self.start.elapsed().as_micros() as u64).wrapping_add(u64::from(self.offset_ms) * 1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::elapsed_ms;

    #[test]
    fn clock_is_monotonic_from_offset() {
        let clock = MonotonicClock::new().with_offset(u32::MAX - 5);
        let a = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let b = clock.now_ms();
        assert!(elapsed_ms(b, a) >= 20);
        assert!(elapsed_ms(b, a) < 10_000);
    }
}
