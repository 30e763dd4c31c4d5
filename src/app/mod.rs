//! Application core: pure domain logic, zero I/O.
//!
//! This module owns the control loop state (config, runtime, history)
//! and orchestrates one tick at a time. All interaction with hardware and
//! storage happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod status;
