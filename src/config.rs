//! Pump configuration parameters
//!
//! All tunable parameters for the irrigation controller. Values are loaded
//! from persistent storage (or compiled defaults) at boot and only ever
//! change through [`validate`]-then-save. The controller treats a
//! `PumpConfig` as read-only and assumes it has already been validated.
//!
//! ## Persisted form
//!
//! The store keeps the config as plain `key=value` lines so it can be
//! inspected and edited by hand:
//!
//! ```text
//! dryOn=2500
//! wetOff=2200
//! pumpPwm=180
//! ...
//! mode=1
//! ```

use core::fmt;
use core::fmt::Write as _;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Documented ranges (enforced by `validate`)
// ---------------------------------------------------------------------------

/// Rails of the 12-bit soil ADC. A conditioned mean at either rail is
/// reported as "no reading", so no threshold may sit on one.
pub const SOIL_RAIL_LOW: u16 = 0;
pub const SOIL_RAIL_HIGH: u16 = 4095;
/// Threshold range the sensor can actually report.
pub const SOIL_THRESHOLD_MIN: u16 = SOIL_RAIL_LOW + 1;
pub const SOIL_THRESHOLD_MAX: u16 = SOIL_RAIL_HIGH - 1;
/// Gap restored between `dry_on` and `wet_off` when the band is inverted.
pub const MIN_HYSTERESIS_GAP: u16 = 50;
/// Debounce floor for both dwell timers.
pub const MIN_DWELL_MS: u32 = 1_000;
pub const MAX_DWELL_MS: u32 = 3_600_000;
pub const MIN_WINDOW_SEC: u32 = 5;
pub const MAX_WINDOW_SEC: u32 = 86_400;
pub const MIN_LOG_PERIOD_MS: u32 = 5_000;
pub const MAX_LOG_PERIOD_MS: u32 = 3_600_000;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Operator-selected pump mode. Persisted and transmitted as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
#[repr(u8)]
pub enum PumpMode {
    /// Pump never runs.
    Off = 0,
    /// Hysteresis control from the soil reading.
    #[default]
    Auto = 1,
    /// Pump forced on (still bounded by the duty-cycle limiter).
    On = 2,
}

impl PumpMode {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Map a stored integer back to a mode. Unknown codes fall back to
    /// `Auto`, matching the config validation rules.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Off,
            2 => Self::On,
            _ => Self::Auto,
        }
    }
}

impl From<u8> for PumpMode {
    fn from(code: u8) -> Self {
        Self::from_code(i64::from(code))
    }
}

impl From<PumpMode> for u8 {
    fn from(mode: PumpMode) -> Self {
        mode.code()
    }
}

impl fmt::Display for PumpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "OFF"),
            Self::Auto => write!(f, "AUTO"),
            Self::On => write!(f, "ON"),
        }
    }
}

// ---------------------------------------------------------------------------
// PumpConfig
// ---------------------------------------------------------------------------

/// Core pump configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PumpConfig {
    // --- Hysteresis band (raw ADC units) ---
    /// Soil reading at or above which AUTO turns the pump on.
    pub dry_on: u16,
    /// Soil reading at or below which AUTO turns the pump off.
    pub wet_off: u16,

    // --- Actuator ---
    /// Pump PWM duty (0-255).
    pub pump_pwm: u8,
    /// Ramp the PWM up on every start instead of stepping.
    pub soft_ramp: bool,

    // --- Debounce ---
    /// Minimum time the pump stays on before AUTO may turn it off.
    pub min_on_ms: u32,
    /// Minimum time the pump stays off before AUTO may turn it on.
    pub min_off_ms: u32,

    // --- Duty-cycle budget ---
    /// Length of the rate-limit window (seconds).
    pub limit_window_sec: u32,
    /// Maximum pump on-time inside one window (seconds).
    pub max_on_sec_in_window: u32,

    // --- Telemetry ---
    /// Period between history samples / soil log points.
    pub log_period_ms: u32,

    pub mode: PumpMode,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            dry_on: 2500,
            wet_off: 2200,

            pump_pwm: 180,
            soft_ramp: true,

            min_on_ms: 5_000,
            min_off_ms: 5_000,

            limit_window_sec: 600,   // 10 min
            max_on_sec_in_window: 60, // at most 1 min on per window

            log_period_ms: 10_000,

            mode: PumpMode::Auto,
        }
    }
}

impl PumpConfig {
    /// Rate-limit window length in milliseconds.
    pub fn limit_window_ms(&self) -> u32 {
        self.limit_window_sec.saturating_mul(1000)
    }

    /// On-time budget per window in milliseconds.
    pub fn max_on_ms_in_window(&self) -> u32 {
        self.max_on_sec_in_window.saturating_mul(1000)
    }

    /// True if every documented invariant holds.
    pub fn is_valid(&self) -> bool {
        *self == validate(self.clone())
    }

    /// Render the persisted `key=value` form.
    pub fn to_kv_text(&self) -> String {
        let mut out = String::with_capacity(192);
        for (key, value) in self.fields() {
            let _ = writeln!(out, "{key}={value}");
        }
        out
    }

    /// Parse the persisted `key=value` form.
    ///
    /// Starts from the compiled defaults; blank lines, unknown keys and
    /// unparseable values are skipped. The result is **not** validated.
    pub fn from_kv_text(text: &str) -> Self {
        let mut cfg = Self::default();
        for line in text.lines() {
            let line = line.trim();
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let Some(v) = parse_int(value.trim()) else {
                log::debug!("config: ignoring unparseable value for '{}'", key);
                continue;
            };
            match key {
                "dryOn" => cfg.dry_on = saturate_u16(v),
                "wetOff" => cfg.wet_off = saturate_u16(v),
                "pumpPwm" => cfg.pump_pwm = v.clamp(0, 255) as u8,
                "softRamp" => cfg.soft_ramp = v != 0,
                "minOnMs" => cfg.min_on_ms = saturate_u32(v),
                "minOffMs" => cfg.min_off_ms = saturate_u32(v),
                "limitWindowSec" => cfg.limit_window_sec = saturate_u32(v),
                "maxOnSecInWindow" => cfg.max_on_sec_in_window = saturate_u32(v),
                // Older firmware stored the log period under this name.
                "logPeriodMs" | "soilLogPeriodMs" => cfg.log_period_ms = saturate_u32(v),
                "mode" => cfg.mode = PumpMode::from_code(v),
                _ => log::debug!("config: ignoring unknown key '{}'", key),
            }
        }
        cfg
    }

    /// `(key, value)` pairs in persisted key order.
    fn fields(&self) -> [(&'static str, u32); 10] {
        [
            ("dryOn", u32::from(self.dry_on)),
            ("wetOff", u32::from(self.wet_off)),
            ("pumpPwm", u32::from(self.pump_pwm)),
            ("softRamp", u32::from(self.soft_ramp)),
            ("minOnMs", self.min_on_ms),
            ("minOffMs", self.min_off_ms),
            ("limitWindowSec", self.limit_window_sec),
            ("maxOnSecInWindow", self.max_on_sec_in_window),
            ("logPeriodMs", self.log_period_ms),
            ("mode", u32::from(self.mode.code())),
        ]
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Clamp every field into its documented range.
///
/// Thresholds are kept strictly inside the ADC rails so both hysteresis
/// edges are reachable by a real reading. Never rejects: an inverted band
/// is repaired by moving `wet_off` [`MIN_HYSTERESIS_GAP`] below `dry_on`
/// (or, when `dry_on` is too low for that, by lifting `dry_on`).
pub fn validate(mut cfg: PumpConfig) -> PumpConfig {
    cfg.dry_on = cfg.dry_on.clamp(SOIL_THRESHOLD_MIN, SOIL_THRESHOLD_MAX);
    cfg.wet_off = cfg.wet_off.clamp(SOIL_THRESHOLD_MIN, SOIL_THRESHOLD_MAX);
    if cfg.wet_off >= cfg.dry_on {
        if cfg.dry_on >= SOIL_THRESHOLD_MIN + MIN_HYSTERESIS_GAP {
            cfg.wet_off = cfg.dry_on - MIN_HYSTERESIS_GAP;
        } else {
            cfg.wet_off = SOIL_THRESHOLD_MIN;
            cfg.dry_on = SOIL_THRESHOLD_MIN + MIN_HYSTERESIS_GAP;
        }
    }

    cfg.min_on_ms = cfg.min_on_ms.clamp(MIN_DWELL_MS, MAX_DWELL_MS);
    cfg.min_off_ms = cfg.min_off_ms.clamp(MIN_DWELL_MS, MAX_DWELL_MS);

    cfg.limit_window_sec = cfg.limit_window_sec.clamp(MIN_WINDOW_SEC, MAX_WINDOW_SEC);
    cfg.max_on_sec_in_window = cfg.max_on_sec_in_window.clamp(1, cfg.limit_window_sec);

    cfg.log_period_ms = cfg.log_period_ms.clamp(MIN_LOG_PERIOD_MS, MAX_LOG_PERIOD_MS);
    cfg
}

/// Human-readable list of changed fields, e.g. `dryOn 2500->2600 mode 1->2`.
/// Returns `"none"` if nothing changed.
pub fn describe_changes(before: &PumpConfig, after: &PumpConfig) -> String {
    let mut out = String::new();
    for ((key, old), (_, new)) in before.fields().into_iter().zip(after.fields()) {
        if old != new {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(out, "{key} {old}->{new}");
        }
    }
    if out.is_empty() {
        out.push_str("none");
    }
    out
}

fn parse_int(value: &str) -> Option<i64> {
    match value {
        "true" => Some(1),
        "false" => Some(0),
        _ => value.parse().ok(),
    }
}

fn saturate_u16(v: i64) -> u16 {
    v.clamp(0, i64::from(u16::MAX)) as u16
}

fn saturate_u32(v: i64) -> u32 {
    v.clamp(0, i64::from(u32::MAX)) as u32
}
