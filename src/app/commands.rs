//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (status/config
//! API, serial console) that the [`AppService`](super::service::AppService)
//! interprets and acts upon.

use crate::config::{PumpConfig, PumpMode};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Replace the configuration. Always validated before it is saved.
    UpdateConfig(PumpConfig),

    /// Change only the operating mode.
    SetMode(PumpMode),

    /// Re-read the persisted config and re-validate it.
    ReloadConfig,

    /// Persist the history snapshot now.
    SaveHistory,

    /// Flush history and ask the firmware to reboot.
    Restart,
}

/// What a successfully handled command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAck {
    /// The config now in effect (after validation).
    ConfigApplied(PumpConfig),
    HistorySaved { samples: usize },
    /// History flushed; the caller must reboot the device.
    RestartPending,
}
