//! Integration tests for the sensor → controller → actuator pipeline.
//!
//! These drive [`AppService::tick`] (and the bare controller) over
//! simulated time with mock hardware and check the actuator calls and
//! audit events that come out the other end.

use soilpump::app::commands::{AppCommand, CommandAck};
use soilpump::app::service::AppService;
use soilpump::config::{PumpConfig, PumpMode};
use soilpump::control::pump::{PumpCommand, PumpController, Runtime};

use soilpump::adapters::persist::Persistence;

use super::mock_hw::{ActuatorCall, CollectSink, MockHardware, MockNvs};

fn scenario_config() -> PumpConfig {
    PumpConfig {
        dry_on: 2500,
        wet_off: 2200,
        min_on_ms: 5000,
        min_off_ms: 5000,
        limit_window_sec: 600,
        max_on_sec_in_window: 60,
        soft_ramp: false,
        ..PumpConfig::default()
    }
}

// ── Reference scenario ────────────────────────────────────────

#[test]
fn reference_scenario_start_stop_lockout_and_window_reset() {
    let cfg = scenario_config();
    // Pump has been off long enough to start right away; window opens at 0.
    let mut rt = Runtime {
        last_pump_change_ms: 0u32.wrapping_sub(5000),
        ..Runtime::at_boot(0)
    };

    let soil_at = |t: u32| if (5000..10_000).contains(&t) { 2100 } else { 2600 };

    let mut lockout_at = None;
    for t in (0..=600_000u32).step_by(1000) {
        let out = PumpController::tick(&cfg, t, Some(soil_at(t)), &rt);
        rt = out.runtime;

        match t {
            0 => assert!(rt.pump_on, "dry soil at t=0 starts the pump"),
            1000..=4000 => assert!(rt.pump_on),
            5000 => {
                assert!(!rt.pump_on, "wet soil after min_on stops the pump");
                assert_eq!(rt.on_time_this_window_ms, 5000);
            }
            6000..=9000 => assert!(!rt.pump_on),
            10_000 => assert!(rt.pump_on, "restart after min_off"),
            11_000..=64_000 => {
                assert!(rt.pump_on);
                assert!(!rt.lockout);
            }
            65_000 => {
                assert!(!rt.pump_on);
                assert!(rt.lockout);
                assert_eq!(rt.on_time_this_window_ms, 60_000);
                assert_eq!(out.command, PumpCommand::Off);
                lockout_at = Some(t);
            }
            66_000..=599_000 => {
                assert!(!rt.pump_on, "pump held off at t={t}");
                assert!(rt.lockout, "lockout held at t={t}");
            }
            600_000 => {
                assert!(!rt.lockout, "window reset clears lockout");
                assert_eq!(rt.window_start_ms, 600_000);
                assert!(rt.pump_on, "dry soil restarts the pump in the new window");
            }
            _ => unreachable!(),
        }
    }
    assert_eq!(lockout_at, Some(65_000));
}

// ── AppService end-to-end ─────────────────────────────────────

#[test]
fn first_boot_writes_defaults_then_ramps_pump_on() {
    let mut store = Persistence::new(MockNvs::new());
    let mut sink = CollectSink::new();
    let mut hw = MockHardware::new();

    let mut app = AppService::boot(0, &mut store, &mut sink);
    assert_eq!(sink.names(), vec!["SYSTEM", "SYSTEM"]);
    assert_eq!(sink.events[1].2, "config_defaults");
    assert!(store.storage().raw("soilpump", "config").is_some());
    assert_eq!(app.config(), &PumpConfig::default());

    hw.soil = Some(3000);
    for t in (1000..5000).step_by(1000) {
        app.tick(t, &mut hw, &mut sink);
        assert!(!app.runtime().pump_on, "waits min_off after boot");
    }
    assert_eq!(hw.last_call(), Some(ActuatorCall::Stop));

    sink.clear();
    app.tick(5000, &mut hw, &mut sink);
    assert_eq!(
        hw.last_call(),
        Some(ActuatorCall::Ramp {
            target: 180,
            duration_ms: 1000
        })
    );
    assert_eq!(sink.events, vec![(5000, "PUMP_ON", "soil=3000 mode=AUTO".to_owned())]);

    app.tick(6000, &mut hw, &mut sink);
    assert_eq!(hw.last_call(), Some(ActuatorCall::Drive(180)));
    assert_eq!(app.tick_count(), 6);
}

#[test]
fn telemetry_follows_log_period() {
    let mut app = AppService::new(PumpConfig::default(), 0);
    let mut hw = MockHardware::new();
    let mut sink = CollectSink::new();
    hw.soil = Some(2300);

    for t in (1000..=30_000).step_by(1000) {
        app.tick(t, &mut hw, &mut sink);
    }
    let soil_ts: Vec<u32> = sink
        .events
        .iter()
        .filter(|(_, n, _)| *n == "SOIL")
        .map(|(ts, _, _)| *ts)
        .collect();
    assert_eq!(soil_ts, vec![10_000, 20_000, 30_000]);
    assert_eq!(app.history().len(), 3);

    let latest = app.history().latest().unwrap();
    assert_eq!(latest.soil, 2300);
    assert_eq!(latest.temp_tenths_c, Some(215));
    assert_eq!(latest.load_pct, 4);
}

#[test]
fn lockout_is_audited_and_clears_with_the_window() {
    let cfg = PumpConfig {
        min_on_ms: 1000,
        min_off_ms: 1000,
        limit_window_sec: 60,
        max_on_sec_in_window: 5,
        soft_ramp: false,
        ..PumpConfig::default()
    };
    let mut app = AppService::new(cfg, 0);
    let mut hw = MockHardware::new();
    let mut sink = CollectSink::new();
    hw.soil = Some(3000);

    for t in (1000..=6000).step_by(1000) {
        app.tick(t, &mut hw, &mut sink);
    }
    assert!(app.runtime().lockout);
    assert_eq!(hw.last_call(), Some(ActuatorCall::Stop));
    assert_eq!(
        sink.names(),
        vec!["PUMP_ON", "PUMP_OFF", "LOCKOUT_ENTER"]
    );
    assert_eq!(
        sink.find("LOCKOUT_ENTER").map(|(ts, _, d)| (*ts, d.as_str())),
        Some((6000, "on_time_window_ms=5000"))
    );

    sink.clear();
    for t in (7000..60_000).step_by(1000) {
        app.tick(t, &mut hw, &mut sink);
        assert!(!hw.pump_on());
    }
    app.tick(60_000, &mut hw, &mut sink);
    assert!(!app.runtime().lockout);
    assert!(app.runtime().pump_on);
    let names: Vec<_> = sink.names().into_iter().filter(|n| *n != "SOIL").collect();
    assert_eq!(names, vec!["LOCKOUT_CLEAR", "PUMP_ON"]);
}

#[test]
fn lost_sensor_holds_running_pump() {
    let cfg = PumpConfig {
        soft_ramp: false,
        ..PumpConfig::default()
    };
    let mut app = AppService::new(cfg, 0);
    let mut hw = MockHardware::new();
    let mut sink = CollectSink::new();

    hw.soil = Some(3000);
    app.tick(5000, &mut hw, &mut sink);
    assert!(app.runtime().pump_on);

    hw.soil = None;
    for t in (6000..=20_000).step_by(1000) {
        app.tick(t, &mut hw, &mut sink);
        assert!(app.runtime().pump_on);
    }
    assert_eq!(app.runtime().on_time_this_window_ms, 15_000);
    assert_eq!(app.status(20_000).soil, None);
}

#[test]
fn actuator_failure_does_not_stall_the_controller() {
    let mut app = AppService::new(PumpConfig::default(), 0);
    let mut hw = MockHardware::new();
    let mut sink = CollectSink::new();
    hw.fail_pwm = true;
    hw.soil = Some(3000);

    app.tick(5000, &mut hw, &mut sink);
    app.tick(6000, &mut hw, &mut sink);
    assert!(app.runtime().pump_on);
    assert_eq!(hw.calls.len(), 2);
    assert_eq!(app.last_command(), PumpCommand::Run { pwm: 180 });
}

#[test]
fn set_mode_off_stops_pump_on_next_tick() {
    let mut store = Persistence::new(MockNvs::new());
    let mut app = AppService::new(
        PumpConfig {
            mode: PumpMode::On,
            soft_ramp: false,
            ..PumpConfig::default()
        },
        0,
    );
    let mut hw = MockHardware::new();
    let mut sink = CollectSink::new();

    app.tick(1000, &mut hw, &mut sink);
    assert_eq!(hw.last_call(), Some(ActuatorCall::Drive(180)));

    let ack = app
        .handle_command(AppCommand::SetMode(PumpMode::Off), 1500, &mut store, &mut sink)
        .unwrap();
    let CommandAck::ConfigApplied(cfg) = ack else {
        panic!("expected ConfigApplied");
    };
    assert_eq!(cfg.mode, PumpMode::Off);
    assert_eq!(
        sink.find("CONFIG_CHANGED").map(|(_, _, d)| d.as_str()),
        Some("mode 2->0")
    );

    app.tick(2000, &mut hw, &mut sink);
    assert_eq!(hw.last_call(), Some(ActuatorCall::Stop));
    assert_eq!(sink.count("PUMP_OFF"), 1);
}
