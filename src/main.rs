//! SoilPump firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   Persistence   MonotonicClock │
//! │  (Sensor+Actuator) (EventSink)    (Config+History over NVS)    │
//! │  ConsoleInput                                                  │
//! │  (commands)                                                    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  PumpController · HistoryRecorder                      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};

use soilpump::adapters::console::{self, ConsoleInput, ConsoleRequest};
use soilpump::adapters::hardware::HardwareAdapter;
use soilpump::adapters::log_sink::LogEventSink;
use soilpump::adapters::persist::Persistence;
use soilpump::adapters::storage::NvsStorage;
use soilpump::adapters::time::MonotonicClock;
use soilpump::app::commands::CommandAck;
use soilpump::app::ports::ActuatorPort;
use soilpump::app::service::{AppService, FIRMWARE_VERSION};
use soilpump::diagnostics::LoadMeter;
use soilpump::drivers::hw_init::{self, BlockingDelay, LedcPwm};
use soilpump::drivers::pump::PumpDriver;
use soilpump::error::Error;
use soilpump::pins;
use soilpump::sensors::SensorHub;
use soilpump::sensors::soil::SoilSensor;
use soilpump::sensors::temperature::ChipTemperature;

/// Control loop period.
const CONTROL_PERIOD_MS: u32 = 1000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SoilPump v{}                        ║", FIRMWARE_VERSION);
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals().map_err(Error::from)?;

    let clock = MonotonicClock::new();
    let mut store = Persistence::new(NvsStorage::new().map_err(Error::from)?);
    let mut log_sink = LogEventSink::new();

    // ── 3. App service (config + history from NVS) ────────────
    let mut app = AppService::boot(clock.now_ms(), &mut store, &mut log_sink);

    let sensor_hub = SensorHub::new(
        SoilSensor::new(pins::SOIL_ADC_CHANNEL),
        ChipTemperature::new(),
    );
    let mut hw = HardwareAdapter::new(sensor_hub, PumpDriver::new(LedcPwm::pump(), BlockingDelay));

    let console = match ConsoleInput::spawn_stdin() {
        Ok(c) => Some(c),
        Err(e) => {
            warn!("Console unavailable: {}", e);
            None
        }
    };
    let mut load = LoadMeter::new();

    info!("System ready. Entering control loop.");

    // ── 4. Control loop ───────────────────────────────────────
    loop {
        let started = clock.now_ms();

        app.tick(started, &mut hw, &mut log_sink);
        app.persist_if_due(started, &mut store);

        if let Some(line) = console.as_ref().and_then(ConsoleInput::poll) {
            match console::parse_line(&line, app.config()) {
                Ok(ConsoleRequest::Status) => match app.status(clock.now_ms()).to_json() {
                    Ok(json) => println!("{json}"),
                    Err(e) => warn!("Status encode failed: {}", e),
                },
                Ok(ConsoleRequest::Command(cmd)) => {
                    match app.handle_command(cmd, clock.now_ms(), &mut store, &mut log_sink) {
                        Ok(CommandAck::RestartPending) => {
                            info!("Restarting");
                            if let Err(e) = hw.stop_pump() {
                                error!("Pump stop before restart failed: {}", e);
                            }
                            std::thread::sleep(Duration::from_millis(100));
                            // SAFETY: esp_restart never returns; no Rust state
                            // needs to outlive it.
                            unsafe { esp_idf_svc::sys::esp_restart() };
                        }
                        Ok(ack) => info!("Command ok: {:?}", ack),
                        Err(e) => warn!("Command failed: {}", e),
                    }
                }
                Err(e) => warn!("console: {}: '{}'", e, line.trim()),
            }
        }

        let busy = clock.now_ms().wrapping_sub(started);
        hw.set_load_pct(load.record(busy, CONTROL_PERIOD_MS));
        if busy < CONTROL_PERIOD_MS {
            std::thread::sleep(Duration::from_millis(u64::from(CONTROL_PERIOD_MS - busy)));
        }
    }
}
