//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the config, the controller runtime and the
//! history ring. It exposes a clean, hardware-agnostic API. All I/O flows
//! through port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                 │        AppService        │
//! ActuatorPort ◀──│ PumpController · History │ ◀─▶ ConfigPort / HistoryPort
//!                 └──────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::{PumpConfig, validate};
use crate::control::elapsed_ms;
use crate::control::pump::{PumpCommand, PumpController, PumpEvent, Runtime};
use crate::error;
use crate::history::{HistoryError, HistoryRecorder, HistorySample};

use super::commands::{AppCommand, CommandAck};
use super::events::{AppEvent, SystemNotice, TelemetryPoint};
use super::ports::{ActuatorPort, ConfigError, ConfigPort, EventSink, HistoryPort, SensorPort};
use super::status::StatusSnapshot;

/// Interval between history snapshots.
pub const HISTORY_SAVE_PERIOD_MS: u32 = 5 * 60 * 1000;

pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: PumpConfig,
    runtime: Runtime,
    history: HistoryRecorder,
    /// Command applied on the most recent tick.
    last_command: PumpCommand,
    last_history_save_ms: u32,
    /// Samples appended since the last successful snapshot.
    history_dirty: bool,
    tick_count: u64,
}

impl AppService {
    /// Construct the service with an empty history. `config` is validated.
    pub fn new(config: PumpConfig, now_ms: u32) -> Self {
        Self {
            config: validate(config),
            runtime: Runtime::at_boot(now_ms),
            history: HistoryRecorder::new(),
            last_command: PumpCommand::Off,
            last_history_save_ms: now_ms,
            history_dirty: false,
            tick_count: 0,
        }
    }

    /// Replace the (empty) history, e.g. with a restored snapshot.
    pub fn with_history(mut self, history: HistoryRecorder) -> Self {
        self.history = history;
        self
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load config and history from the store, falling back to defaults
    /// and an empty history. Never fails.
    pub fn boot(
        now_ms: u32,
        store: &mut (impl ConfigPort + HistoryPort),
        sink: &mut impl EventSink,
    ) -> Self {
        sink.emit(
            now_ms,
            &AppEvent::System(SystemNotice::Boot {
                version: FIRMWARE_VERSION,
            }),
        );

        let config = match store.load() {
            Ok(cfg) => cfg,
            Err(ConfigError::NotFound) => {
                info!("AppService: no stored config, writing defaults");
                sink.emit(now_ms, &AppEvent::System(SystemNotice::ConfigDefaults));
                let cfg = PumpConfig::default();
                if let Err(e) = store.save(&cfg) {
                    warn!("AppService: could not persist default config: {}", e);
                }
                cfg
            }
            Err(e) => {
                warn!("AppService: config load failed ({}), using defaults", e);
                sink.emit(now_ms, &AppEvent::System(SystemNotice::ConfigDefaults));
                PumpConfig::default()
            }
        };

        let history = match store.load_history() {
            Ok(h) => {
                sink.emit(
                    now_ms,
                    &AppEvent::System(SystemNotice::HistoryRestored { samples: h.len() }),
                );
                h
            }
            Err(HistoryError::NotFound) => {
                info!("AppService: no stored history");
                HistoryRecorder::new()
            }
            Err(e) => {
                warn!("AppService: {}, starting with empty history", e);
                sink.emit(now_ms, &AppEvent::System(SystemNotice::HistoryReset));
                HistoryRecorder::new()
            }
        };

        info!(
            "AppService started: mode={} dryOn={} wetOff={} history={}",
            config.mode,
            config.dry_on,
            config.wet_off,
            history.len()
        );
        Self::new(config, now_ms).with_history(history)
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle: sample → decide → actuate → log.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`]; this avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u32,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) -> PumpCommand {
        self.tick_count += 1;

        // 1. Sample
        let sample = hw.sample();
        self.runtime.soil_now = sample.soil_raw;
        self.runtime.temp_tenths_c = sample.temp_tenths_c;
        self.runtime.load_pct = sample.load_pct;

        // 2. Decide (pure)
        let outcome = PumpController::tick(&self.config, now_ms, sample.soil_raw, &self.runtime);
        self.runtime = outcome.runtime;

        // 3. Actuate
        self.apply_command(outcome.command, hw);
        self.last_command = outcome.command;

        // 4. Audit
        for ev in &outcome.events {
            let event = self.audit_event(*ev);
            sink.emit(now_ms, &event);
        }

        // 5. History / soil log
        if elapsed_ms(now_ms, self.runtime.last_log_ms) >= self.config.log_period_ms {
            self.runtime.last_log_ms = now_ms;
            self.record_sample(now_ms, sink);
        }

        outcome.command
    }

    /// Save the history snapshot if the save period has elapsed and new
    /// samples exist. Returns `true` if a snapshot was written.
    pub fn persist_if_due(&mut self, now_ms: u32, store: &mut impl HistoryPort) -> bool {
        if elapsed_ms(now_ms, self.last_history_save_ms) < HISTORY_SAVE_PERIOD_MS {
            return false;
        }
        self.last_history_save_ms = now_ms;
        if !self.history_dirty {
            return false;
        }
        match store.save_history(&self.history) {
            Ok(()) => {
                self.history_dirty = false;
                true
            }
            Err(e) => {
                warn!("History auto-save failed: {}", e);
                false
            }
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (status/config API, console).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u32,
        store: &mut (impl ConfigPort + HistoryPort),
        sink: &mut impl EventSink,
    ) -> error::Result<CommandAck> {
        match cmd {
            AppCommand::UpdateConfig(cfg) => {
                let applied = self.apply_config(cfg, now_ms, store, sink)?;
                Ok(CommandAck::ConfigApplied(applied))
            }
            AppCommand::SetMode(mode) => {
                let cfg = PumpConfig {
                    mode,
                    ..self.config.clone()
                };
                let applied = self.apply_config(cfg, now_ms, store, sink)?;
                Ok(CommandAck::ConfigApplied(applied))
            }
            AppCommand::ReloadConfig => {
                let loaded = store.load()?;
                self.replace_config(validate(loaded), now_ms, sink);
                info!("Configuration reloaded from store");
                Ok(CommandAck::ConfigApplied(self.config.clone()))
            }
            AppCommand::SaveHistory => {
                store.save_history(&self.history)?;
                self.history_dirty = false;
                self.last_history_save_ms = now_ms;
                Ok(CommandAck::HistorySaved {
                    samples: self.history.len(),
                })
            }
            AppCommand::Restart => {
                sink.emit(now_ms, &AppEvent::System(SystemNotice::RestartRequested));
                // Restart proceeds even if the flush fails.
                match store.save_history(&self.history) {
                    Ok(()) => self.history_dirty = false,
                    Err(e) => warn!("History flush before restart failed: {}", e),
                }
                Ok(CommandAck::RestartPending)
            }
        }
    }

    /// Validate, apply and persist a new configuration.
    ///
    /// The validated config takes effect immediately even if persisting
    /// it fails; the error is returned so the caller can report it.
    pub fn apply_config(
        &mut self,
        new_config: PumpConfig,
        now_ms: u32,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> Result<PumpConfig, ConfigError> {
        let validated = validate(new_config);
        self.replace_config(validated.clone(), now_ms, sink);
        store.save(&validated)?;
        Ok(validated)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self, now_ms: u32) -> StatusSnapshot {
        StatusSnapshot::build(&self.config, &self.runtime, &self.history, now_ms)
    }

    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    pub fn last_command(&self) -> PumpCommand {
        self.last_command
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn replace_config(&mut self, config: PumpConfig, now_ms: u32, sink: &mut impl EventSink) {
        let before = core::mem::replace(&mut self.config, config);
        sink.emit(
            now_ms,
            &AppEvent::ConfigChanged {
                before,
                after: self.config.clone(),
            },
        );
    }

    /// Translate a controller command into port calls.
    fn apply_command(&self, cmd: PumpCommand, hw: &mut impl ActuatorPort) {
        let result = match cmd {
            PumpCommand::Off => hw.stop_pump(),
            PumpCommand::Run { pwm } => hw.drive_pump(pwm),
            PumpCommand::Ramp {
                target,
                duration_ms,
            } => hw.ramp_pump(target, duration_ms),
        };
        if let Err(e) = result {
            warn!("Pump command {:?} failed: {}", cmd, e);
        }
    }

    fn audit_event(&self, ev: PumpEvent) -> AppEvent {
        let rt = &self.runtime;
        match ev {
            PumpEvent::PumpOn => AppEvent::PumpOn {
                soil: rt.soil_now,
                mode: self.config.mode,
            },
            PumpEvent::PumpOff => AppEvent::PumpOff {
                soil: rt.soil_now,
                mode: self.config.mode,
            },
            PumpEvent::LockoutEnter => AppEvent::LockoutEnter {
                on_time_ms: rt.on_time_this_window_ms,
            },
            PumpEvent::LockoutClear => AppEvent::LockoutClear,
        }
    }

    fn record_sample(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        let rt = &self.runtime;
        self.history.append(HistorySample {
            // A lost probe is charted as 0.
            soil: rt.soil_now.unwrap_or(0),
            temp_tenths_c: rt.temp_tenths_c,
            load_pct: rt.load_pct,
        });
        self.history_dirty = true;
        sink.emit(
            now_ms,
            &AppEvent::Telemetry(TelemetryPoint {
                soil: rt.soil_now,
                temp_tenths_c: rt.temp_tenths_c,
                load_pct: rt.load_pct,
                pump_on: rt.pump_on,
                lockout: rt.lockout,
                on_time_window_ms: rt.on_time_this_window_ms,
            }),
        );
    }
}
