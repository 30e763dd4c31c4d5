//! Integration tests for boot-time restore, periodic history snapshots
//! and the config command path, all over the mock NVS.

use soilpump::adapters::persist::{CONFIG_KEY, HISTORY_KEY, NAMESPACE, Persistence};
use soilpump::app::commands::{AppCommand, CommandAck};
use soilpump::app::ports::{ConfigError, ConfigPort, HistoryPort, StoragePort};
use soilpump::app::service::{AppService, HISTORY_SAVE_PERIOD_MS};
use soilpump::config::{PumpConfig, PumpMode};
use soilpump::error::Error;
use soilpump::history::{HistoryRecorder, HistorySample};

use super::mock_hw::{CollectSink, MockHardware, MockNvs};

fn sample(soil: u16) -> HistorySample {
    HistorySample {
        soil,
        temp_tenths_c: Some(200),
        load_pct: 1,
    }
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_restores_config_and_history() {
    let mut store = Persistence::new(MockNvs::new());
    let cfg = PumpConfig {
        dry_on: 2800,
        mode: PumpMode::Off,
        ..PumpConfig::default()
    };
    store.save(&cfg).unwrap();
    let mut h = HistoryRecorder::new();
    for s in [2000, 2100, 2200] {
        h.append(sample(s));
    }
    store.save_history(&h).unwrap();

    let mut sink = CollectSink::new();
    let app = AppService::boot(0, &mut store, &mut sink);

    assert_eq!(app.config(), &cfg);
    let soils: Vec<u16> = app.history().iter().map(|s| s.soil).collect();
    assert_eq!(soils, vec![2000, 2100, 2200]);
    assert_eq!(sink.events.len(), 2);
    assert!(sink.events[0].2.starts_with("boot v"));
    assert_eq!(sink.events[1].2, "history_restored samples=3");
}

#[test]
fn corrupt_history_falls_back_to_empty() {
    let mut store = Persistence::new(MockNvs::new());
    store
        .storage_mut()
        .write(NAMESPACE, HISTORY_KEY, b"\x01\x02garbage")
        .unwrap();

    let mut sink = CollectSink::new();
    let app = AppService::boot(0, &mut store, &mut sink);
    assert!(app.history().is_empty());
    assert!(sink.events.iter().any(|(_, _, d)| d == "history_reset"));
}

#[test]
fn history_with_other_capacity_is_rejected() {
    let mut small: HistoryRecorder<16> = HistoryRecorder::new();
    small.append(sample(1234));
    let blob = small.to_snapshot().unwrap();

    let mut store = Persistence::new(MockNvs::new());
    store
        .storage_mut()
        .write(NAMESPACE, HISTORY_KEY, &blob)
        .unwrap();

    let mut sink = CollectSink::new();
    let app = AppService::boot(0, &mut store, &mut sink);
    assert!(app.history().is_empty());
    assert_eq!(sink.count("SYSTEM"), 3);
}

#[test]
fn unreadable_config_uses_defaults_without_overwriting() {
    let mut store = Persistence::new(MockNvs::new());
    store
        .storage_mut()
        .write(NAMESPACE, CONFIG_KEY, &[0xff, 0xfe])
        .unwrap();
    let writes_before = store.storage().writes;

    let mut sink = CollectSink::new();
    let app = AppService::boot(0, &mut store, &mut sink);
    assert_eq!(app.config(), &PumpConfig::default());
    assert!(sink.events.iter().any(|(_, _, d)| d == "config_defaults"));
    assert_eq!(store.storage().writes, writes_before);
}

// ── Periodic history snapshots ────────────────────────────────

#[test]
fn history_saved_every_period_when_dirty() {
    let mut store = Persistence::new(MockNvs::new());
    let mut app = AppService::new(PumpConfig::default(), 0);
    let mut hw = MockHardware::new();
    let mut sink = CollectSink::new();
    hw.soil = Some(2300);

    app.tick(10_000, &mut hw, &mut sink);
    assert_eq!(app.history().len(), 1);

    assert!(!app.persist_if_due(HISTORY_SAVE_PERIOD_MS - 1, &mut store));
    assert!(app.persist_if_due(HISTORY_SAVE_PERIOD_MS, &mut store));
    assert_eq!(store.load_history().unwrap(), *app.history());

    // Nothing new since the last snapshot.
    assert!(!app.persist_if_due(2 * HISTORY_SAVE_PERIOD_MS, &mut store));
    assert_eq!(store.storage().writes, 1);
}

#[test]
fn failed_snapshot_is_retried_next_period() {
    let mut store = Persistence::new(MockNvs::new());
    let mut app = AppService::new(PumpConfig::default(), 0);
    let mut hw = MockHardware::new();
    let mut sink = CollectSink::new();
    hw.soil = Some(2300);
    app.tick(10_000, &mut hw, &mut sink);

    store.storage_mut().fail_writes = true;
    assert!(!app.persist_if_due(HISTORY_SAVE_PERIOD_MS, &mut store));

    store.storage_mut().fail_writes = false;
    assert!(app.persist_if_due(2 * HISTORY_SAVE_PERIOD_MS, &mut store));
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn update_config_is_validated_before_save() {
    let mut store = Persistence::new(MockNvs::new());
    let mut app = AppService::new(PumpConfig::default(), 0);
    let mut sink = CollectSink::new();

    let bad = PumpConfig {
        dry_on: 2000,
        wet_off: 2400,
        min_on_ms: 1,
        ..PumpConfig::default()
    };
    let ack = app
        .handle_command(AppCommand::UpdateConfig(bad), 0, &mut store, &mut sink)
        .unwrap();
    let CommandAck::ConfigApplied(applied) = ack else {
        panic!("expected ConfigApplied");
    };
    assert!(applied.is_valid());
    assert_eq!(applied.wet_off, 1950);
    assert_eq!(applied.min_on_ms, 1000);
    assert_eq!(store.load().unwrap(), applied);
    assert_eq!(app.config(), &applied);
    assert_eq!(
        sink.find("CONFIG_CHANGED").map(|(_, _, d)| d.as_str()),
        Some("dryOn 2500->2000 wetOff 2200->1950 minOnMs 5000->1000")
    );
}

#[test]
fn update_config_applies_even_if_save_fails() {
    let mut store = Persistence::new(MockNvs::new());
    store.storage_mut().fail_writes = true;
    let mut app = AppService::new(PumpConfig::default(), 0);
    let mut sink = CollectSink::new();

    let result = app.handle_command(
        AppCommand::SetMode(PumpMode::Off),
        0,
        &mut store,
        &mut sink,
    );
    assert_eq!(result, Err(Error::Config(ConfigError::StorageFull)));
    assert_eq!(app.config().mode, PumpMode::Off);
}

#[test]
fn reload_reads_hand_edited_config() {
    let mut store = Persistence::new(MockNvs::new());
    let mut app = AppService::new(PumpConfig::default(), 0);
    let mut sink = CollectSink::new();

    store
        .storage_mut()
        .write(
            NAMESPACE,
            CONFIG_KEY,
            b"dryOn=3000\nsoilLogPeriodMs=60000\nbogus=1\n",
        )
        .unwrap();
    let ack = app
        .handle_command(AppCommand::ReloadConfig, 0, &mut store, &mut sink)
        .unwrap();
    assert_eq!(ack, CommandAck::ConfigApplied(app.config().clone()));
    assert_eq!(app.config().dry_on, 3000);
    assert_eq!(app.config().log_period_ms, 60_000);
    assert_eq!(sink.count("CONFIG_CHANGED"), 1);
}

#[test]
fn reload_without_stored_config_fails() {
    let mut store = Persistence::new(MockNvs::new());
    let mut app = AppService::new(PumpConfig::default(), 0);
    let mut sink = CollectSink::new();
    assert_eq!(
        app.handle_command(AppCommand::ReloadConfig, 0, &mut store, &mut sink),
        Err(Error::Config(ConfigError::NotFound))
    );
    assert!(sink.events.is_empty());
}

#[test]
fn restart_flushes_history() {
    let mut store = Persistence::new(MockNvs::new());
    let mut h = HistoryRecorder::new();
    h.append(sample(2222));
    let mut app = AppService::new(PumpConfig::default(), 0).with_history(h);
    let mut sink = CollectSink::new();

    let ack = app
        .handle_command(AppCommand::Restart, 42, &mut store, &mut sink)
        .unwrap();
    assert_eq!(ack, CommandAck::RestartPending);
    assert_eq!(sink.events, vec![(42, "SYSTEM", "restart_requested".to_owned())]);
    assert_eq!(store.load_history().unwrap().latest(), Some(sample(2222)));
}

#[test]
fn save_history_command_reports_sample_count() {
    let mut store = Persistence::new(MockNvs::new());
    let mut app = AppService::new(PumpConfig::default(), 0);
    let mut sink = CollectSink::new();
    assert_eq!(
        app.handle_command(AppCommand::SaveHistory, 0, &mut store, &mut sink),
        Ok(CommandAck::HistorySaved { samples: 0 })
    );
    assert!(store.storage().exists(NAMESPACE, HISTORY_KEY));
}

#[test]
fn status_json_after_a_few_ticks() {
    let mut app = AppService::new(PumpConfig::default(), 0);
    let mut hw = MockHardware::new();
    let mut sink = CollectSink::new();
    hw.soil = Some(2400);
    hw.temp_tenths_c = None;
    app.tick(10_000, &mut hw, &mut sink);

    let json = app.status(10_000).to_json().unwrap();
    assert!(json.contains("\"soil\":2400"));
    assert!(json.contains("\"temp_c\":null"));
    assert!(json.contains("\"hist_soil\":[2400]"));
    assert!(json.contains("\"hist_temp\":[null]"));
}
