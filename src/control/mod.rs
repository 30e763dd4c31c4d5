//! Pump decision logic.
//!
//! Pure functions only: no I/O, no clock reads, no logging side effects
//! that change behaviour. Everything here is exercised on the host.

pub mod pump;
pub mod ramp;

/// Milliseconds between two readings of a wrapping `u32` millisecond
/// counter. Correct across the ~49.7 day wraparound as long as the real
/// interval is shorter than that.
#[inline]
pub const fn elapsed_ms(now_ms: u32, then_ms: u32) -> u32 {
    now_ms.wrapping_sub(then_ms)
}
