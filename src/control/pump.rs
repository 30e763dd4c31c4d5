//! Pump decision engine.
//!
//! [`PumpController::tick`] is a pure function of
//! `(config, now, soil reading, previous runtime)`. It returns the next
//! runtime, the actuator command for this tick and the audit events
//! raised while getting there.
//!
//! ## Rule precedence
//!
//! 1. Duty-cycle limiter (sliding window, forced-off lockout)
//! 2. Manual `Off`
//! 3. Manual `On`
//! 4. `Auto` hysteresis with min on/off dwell
//!
//! The limiter wins over a forced `On`: the budget protects the pump
//! motor, the operator's mode does not.

use serde::Serialize;

use crate::config::{PumpConfig, PumpMode};
use crate::control::elapsed_ms;

/// Duration of a soft-start ramp.
pub const RAMP_DURATION_MS: u32 = 1_000;

/// Maximum number of events a single tick can raise
/// (clear + off + enter is the worst case).
pub const MAX_EVENTS_PER_TICK: usize = 4;

// ---------------------------------------------------------------------------
// Runtime state
// ---------------------------------------------------------------------------

/// Mutable controller state. Owned by the control loop and replaced
/// wholesale once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Runtime {
    /// Latest conditioned soil reading (`None` = sensor lost).
    pub soil_now: Option<u16>,
    pub temp_tenths_c: Option<i16>,
    pub load_pct: u8,

    pub pump_on: bool,
    pub lockout: bool,

    pub last_pump_change_ms: u32,
    pub window_start_ms: u32,
    /// Pump on-time accumulated in the current window.
    pub on_time_this_window_ms: u32,
    pub last_log_ms: u32,
    /// Timestamp of the previous tick.
    pub last_tick_ms: u32,
}

impl Runtime {
    /// Fresh state at boot. The pump is off and counts as having just
    /// changed, so it waits `min_off_ms` before the first start.
    pub const fn at_boot(now_ms: u32) -> Self {
        Self {
            soil_now: None,
            temp_tenths_c: None,
            load_pct: 0,
            pump_on: false,
            lockout: false,
            last_pump_change_ms: now_ms,
            window_start_ms: now_ms,
            on_time_this_window_ms: 0,
            last_log_ms: now_ms,
            last_tick_ms: now_ms,
        }
    }

    pub const fn state(&self) -> PumpState {
        if self.lockout {
            PumpState::Lockout
        } else if self.pump_on {
            PumpState::On
        } else {
            PumpState::Off
        }
    }
}

/// Externally visible pump state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PumpState {
    Off,
    On,
    /// Forced off until the rate-limit window resets.
    Lockout,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// What the actuator should do after this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpCommand {
    /// Drive PWM to 0.
    Off,
    /// Drive PWM straight to `pwm`.
    Run { pwm: u8 },
    /// Pump just started with soft ramp enabled.
    Ramp { target: u8, duration_ms: u32 },
}

impl PumpCommand {
    pub const fn target_pwm(&self) -> u8 {
        match *self {
            Self::Off => 0,
            Self::Run { pwm } => pwm,
            Self::Ramp { target, .. } => target,
        }
    }
}

/// Audit events raised by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpEvent {
    PumpOn,
    PumpOff,
    LockoutEnter,
    LockoutClear,
}

impl PumpEvent {
    pub const fn name(self) -> &'static str {
        match self {
            Self::PumpOn => "PUMP_ON",
            Self::PumpOff => "PUMP_OFF",
            Self::LockoutEnter => "LOCKOUT_ENTER",
            Self::LockoutClear => "LOCKOUT_CLEAR",
        }
    }
}

/// Result of one controller tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub runtime: Runtime,
    pub command: PumpCommand,
    pub events: heapless::Vec<PumpEvent, MAX_EVENTS_PER_TICK>,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Stateless pump decision engine.
pub struct PumpController;

impl PumpController {
    /// Compute the next runtime state.
    ///
    /// `config` must already be validated. A `None` soil reading holds
    /// the current `Auto` decision; the limiter still integrates on-time
    /// for a pump that is already running.
    pub fn tick(
        config: &PumpConfig,
        now_ms: u32,
        soil: Option<u16>,
        prev: &Runtime,
    ) -> TickOutcome {
        let mut rt = *prev;
        let mut events = heapless::Vec::new();
        let was_on = prev.pump_on;

        // ── 1. Duty-cycle limiter ───────────────────────────────
        if elapsed_ms(now_ms, rt.window_start_ms) >= config.limit_window_ms() {
            rt.window_start_ms = now_ms;
            rt.on_time_this_window_ms = 0;
            if rt.lockout {
                rt.lockout = false;
                let _ = events.push(PumpEvent::LockoutClear);
            }
        }

        // The whole interval since the previous tick is charged to the
        // current window, even if part of it fell in the one just closed.
        if rt.pump_on {
            rt.on_time_this_window_ms = rt
                .on_time_this_window_ms
                .saturating_add(elapsed_ms(now_ms, rt.last_tick_ms));
        }
        rt.last_tick_ms = now_ms;

        let budget = config.max_on_ms_in_window();
        if rt.on_time_this_window_ms >= budget {
            rt.on_time_this_window_ms = budget;
            set_pump(&mut rt, false, now_ms, &mut events);
            if !rt.lockout {
                rt.lockout = true;
                let _ = events.push(PumpEvent::LockoutEnter);
            }
        }

        if rt.lockout {
            return TickOutcome {
                runtime: rt,
                command: PumpCommand::Off,
                events,
            };
        }

        // ── 2-4. Mode ───────────────────────────────────────────
        let want_on = match config.mode {
            PumpMode::Off => false,
            PumpMode::On => true,
            PumpMode::Auto => match soil {
                Some(soil) => auto_decision(config, now_ms, soil, &rt),
                None => rt.pump_on,
            },
        };
        set_pump(&mut rt, want_on, now_ms, &mut events);

        let command = if !rt.pump_on {
            PumpCommand::Off
        } else if !was_on && config.soft_ramp {
            PumpCommand::Ramp {
                target: config.pump_pwm,
                duration_ms: RAMP_DURATION_MS,
            }
        } else {
            PumpCommand::Run {
                pwm: config.pump_pwm,
            }
        };

        TickOutcome {
            runtime: rt,
            command,
            events,
        }
    }
}

/// Hysteresis with dwell: only flip once the current state has been
/// held for its minimum time.
fn auto_decision(config: &PumpConfig, now_ms: u32, soil: u16, rt: &Runtime) -> bool {
    let held_ms = elapsed_ms(now_ms, rt.last_pump_change_ms);
    if rt.pump_on {
        !(soil <= config.wet_off && held_ms >= config.min_on_ms)
    } else {
        soil >= config.dry_on && held_ms >= config.min_off_ms
    }
}

fn set_pump(
    rt: &mut Runtime,
    on: bool,
    now_ms: u32,
    events: &mut heapless::Vec<PumpEvent, MAX_EVENTS_PER_TICK>,
) {
    if rt.pump_on == on {
        return;
    }
    rt.pump_on = on;
    rt.last_pump_change_ms = now_ms;
    let _ = events.push(if on {
        PumpEvent::PumpOn
    } else {
        PumpEvent::PumpOff
    });
}
