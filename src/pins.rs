//! GPIO / peripheral pin assignments for the SoilPump controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Pump (logic-level MOSFET, low-side switch)
// ---------------------------------------------------------------------------

/// LEDC PWM output driving the pump MOSFET gate.
pub const PUMP_PWM_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Sensors (ADC1)
// ---------------------------------------------------------------------------

/// Capacitive soil-moisture probe, analog output.
/// ADC1 channel 3 (GPIO 4 on ESP32-S3). Higher reading = drier soil.
pub const SOIL_ADC_GPIO: i32 = 4;
pub const SOIL_ADC_CHANNEL: u32 = 3;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits). 8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC base frequency for the pump motor (25 kHz, inaudible).
pub const PUMP_PWM_FREQ_HZ: u32 = 25_000;
