//! Mock adapters for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history without touching real GPIO/PWM registers.

use std::collections::HashMap;

use soilpump::app::events::AppEvent;
use soilpump::app::ports::{ActuatorPort, EventSink, SensorPort, StorageError, StoragePort};
use soilpump::error::ActuatorError;
use soilpump::sensors::SensorSample;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Drive(u8),
    Ramp { target: u8, duration_ms: u32 },
    Stop,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    /// Value returned by the next sample.
    pub soil: Option<u16>,
    pub temp_tenths_c: Option<i16>,
    pub load_pct: u8,
    pub calls: Vec<ActuatorCall>,
    /// Make every actuator call fail.
    pub fail_pwm: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            soil: None,
            temp_tenths_c: Some(215),
            load_pct: 4,
            calls: Vec::new(),
            fail_pwm: false,
        }
    }

    pub fn last_call(&self) -> Option<ActuatorCall> {
        self.calls.last().copied()
    }

    /// Whether the most recent call left the pump running.
    pub fn pump_on(&self) -> bool {
        match self.last_call() {
            Some(ActuatorCall::Drive(duty)) => duty > 0,
            Some(ActuatorCall::Ramp { target, .. }) => target > 0,
            Some(ActuatorCall::Stop) | None => false,
        }
    }

    fn record(&mut self, call: ActuatorCall) -> Result<(), ActuatorError> {
        self.calls.push(call);
        if self.fail_pwm {
            Err(ActuatorError::PwmWriteFailed)
        } else {
            Ok(())
        }
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn sample(&mut self) -> SensorSample {
        SensorSample {
            soil_raw: self.soil,
            temp_tenths_c: self.temp_tenths_c,
            load_pct: self.load_pct,
        }
    }
}

impl ActuatorPort for MockHardware {
    fn drive_pump(&mut self, pwm: u8) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Drive(pwm))
    }

    fn ramp_pump(&mut self, target: u8, duration_ms: u32) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Ramp {
            target,
            duration_ms,
        })
    }

    fn stop_pump(&mut self) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Stop)
    }
}

// ── MockNvs ───────────────────────────────────────────────────

pub struct MockNvs {
    store: HashMap<String, Vec<u8>>,
    /// Make every write fail with `Full`.
    pub fail_writes: bool,
    pub writes: usize,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self {
            store: HashMap::new(),
            fail_writes: false,
            writes: 0,
        }
    }

    pub fn raw(&self, namespace: &str, key: &str) -> Option<&[u8]> {
        self.store
            .get(&format!("{}::{}", namespace, key))
            .map(Vec::as_slice)
    }
}

impl Default for MockNvs {
    fn default() -> Self {
        Self::new()
    }
}

impl StoragePort for MockNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.store.get(&format!("{}::{}", namespace, key)) {
            Some(v) if v.len() > buf.len() => Err(StorageError::TooLarge),
            Some(v) => {
                buf[..v.len()].copy_from_slice(v);
                Ok(v.len())
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Full);
        }
        self.writes += 1;
        self.store
            .insert(format!("{}::{}", namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.remove(&format!("{}::{}", namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store.contains_key(&format!("{}::{}", namespace, key))
    }
}

// ── CollectSink ───────────────────────────────────────────────

/// Event sink that keeps `(ts, name, detail)` for every event.
pub struct CollectSink {
    pub events: Vec<(u32, &'static str, String)>,
}

#[allow(dead_code)]
impl CollectSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(|(_, name, _)| *name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|(_, n, _)| *n == name).count()
    }

    pub fn find(&self, name: &str) -> Option<&(u32, &'static str, String)> {
        self.events.iter().find(|(_, n, _)| *n == name)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for CollectSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for CollectSink {
    fn emit(&mut self, ts_ms: u32, event: &AppEvent) {
        self.events.push((ts_ms, event.name(), event.detail()));
    }
}
