//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them: log to serial, append to CSV, etc.
//!
//! Every event except [`AppEvent::Telemetry`] is an audit record with a
//! stable [`name`](AppEvent::name) and a free-text [`detail`](AppEvent::detail).

use crate::config::{PumpConfig, PumpMode, describe_changes};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Periodic soil log point.
    Telemetry(TelemetryPoint),

    PumpOn {
        soil: Option<u16>,
        mode: PumpMode,
    },

    PumpOff {
        soil: Option<u16>,
        mode: PumpMode,
    },

    /// Duty-cycle budget exhausted; pump forced off.
    LockoutEnter { on_time_ms: u32 },

    /// Rate-limit window reset released the lockout.
    LockoutClear,

    /// A validated config replaced the previous one.
    ConfigChanged {
        before: PumpConfig,
        after: PumpConfig,
    },

    System(SystemNotice),
}

/// Lifecycle notices, logged as `SYSTEM <detail>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemNotice {
    Boot { version: &'static str },
    /// Persisted config missing or unreadable; compiled defaults in use.
    ConfigDefaults,
    HistoryRestored { samples: usize },
    /// Persisted history rejected; starting empty.
    HistoryReset,
    RestartRequested,
}

/// A point-in-time soil log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryPoint {
    pub soil: Option<u16>,
    pub temp_tenths_c: Option<i16>,
    pub load_pct: u8,
    pub pump_on: bool,
    pub lockout: bool,
    pub on_time_window_ms: u32,
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Telemetry(_) => "SOIL",
            Self::PumpOn { .. } => "PUMP_ON",
            Self::PumpOff { .. } => "PUMP_OFF",
            Self::LockoutEnter { .. } => "LOCKOUT_ENTER",
            Self::LockoutClear => "LOCKOUT_CLEAR",
            Self::ConfigChanged { .. } => "CONFIG_CHANGED",
            Self::System(_) => "SYSTEM",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Self::Telemetry(t) => format!(
                "soil={} pump_on={} lockout={} on_time_window_ms={}",
                fmt_soil(t.soil),
                u8::from(t.pump_on),
                u8::from(t.lockout),
                t.on_time_window_ms
            ),
            Self::PumpOn { soil, mode } | Self::PumpOff { soil, mode } => {
                format!("soil={} mode={}", fmt_soil(*soil), mode)
            }
            Self::LockoutEnter { on_time_ms } => format!("on_time_window_ms={on_time_ms}"),
            Self::LockoutClear => "window_reset".into(),
            Self::ConfigChanged { before, after } => describe_changes(before, after),
            Self::System(n) => match n {
                SystemNotice::Boot { version } => format!("boot v{version}"),
                SystemNotice::ConfigDefaults => "config_defaults".into(),
                SystemNotice::HistoryRestored { samples } => {
                    format!("history_restored samples={samples}")
                }
                SystemNotice::HistoryReset => "history_reset".into(),
                SystemNotice::RestartRequested => "restart_requested".into(),
            },
        }
    }
}

fn fmt_soil(soil: Option<u16>) -> String {
    soil.map_or_else(|| "none".into(), |s| s.to_string())
}
