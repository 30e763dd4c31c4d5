//! Serial console command adapter.
//!
//! Lines typed on the UART console are parsed into [`AppCommand`]s:
//!
//! ```text
//! status                      print the JSON status snapshot
//! mode off|auto|on            change the operating mode (or 0|1|2)
//! set dryOn=2600 minOnMs=8000 overlay fields onto the current config
//! reload                      re-read the persisted config
//! save                        persist the history snapshot now
//! restart                     flush history and reboot
//! ```

use core::fmt;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use log::warn;

use crate::app::commands::AppCommand;
use crate::config::{PumpConfig, PumpMode};

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleRequest {
    Status,
    Command(AppCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    Empty,
    UnknownCommand,
    BadArgument,
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty line"),
            Self::UnknownCommand => {
                write!(f, "unknown command (status|mode|set|reload|save|restart)")
            }
            Self::BadArgument => write!(f, "bad argument"),
        }
    }
}

/// Parse one console line. `current` is the config `set` overlays onto.
pub fn parse_line(line: &str, current: &PumpConfig) -> Result<ConsoleRequest, ConsoleError> {
    let mut words = line.split_whitespace();
    let verb = words.next().ok_or(ConsoleError::Empty)?;
    let request = match verb {
        "status" => ConsoleRequest::Status,
        "reload" => ConsoleRequest::Command(AppCommand::ReloadConfig),
        "save" => ConsoleRequest::Command(AppCommand::SaveHistory),
        "restart" => ConsoleRequest::Command(AppCommand::Restart),
        "mode" => {
            let mode = match words.next().ok_or(ConsoleError::BadArgument)? {
                "off" | "0" => PumpMode::Off,
                "auto" | "1" => PumpMode::Auto,
                "on" | "2" => PumpMode::On,
                _ => return Err(ConsoleError::BadArgument),
            };
            ConsoleRequest::Command(AppCommand::SetMode(mode))
        }
        "set" => {
            let mut text = current.to_kv_text();
            let mut any = false;
            for assignment in words.by_ref() {
                if !assignment.contains('=') {
                    return Err(ConsoleError::BadArgument);
                }
                text.push_str(assignment);
                text.push('\n');
                any = true;
            }
            if !any {
                return Err(ConsoleError::BadArgument);
            }
            // Later lines win, so the assignments override the current values.
            ConsoleRequest::Command(AppCommand::UpdateConfig(PumpConfig::from_kv_text(&text)))
        }
        _ => return Err(ConsoleError::UnknownCommand),
    };
    if words.next().is_some() {
        return Err(ConsoleError::BadArgument);
    }
    Ok(request)
}

/// Non-blocking line source fed by a background reader thread.
pub struct ConsoleInput {
    lines: Receiver<String>,
}

impl ConsoleInput {
    /// Spawn a thread that forwards stdin lines.
    pub fn spawn_stdin() -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("console".into())
            .stack_size(4096)
            .spawn(move || {
                for line in std::io::stdin().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("console: read failed: {}", e),
                    }
                }
            })?;
        Ok(Self { lines: rx })
    }

    /// Wrap an existing channel (tests).
    pub fn from_receiver(lines: Receiver<String>) -> Self {
        Self { lines }
    }

    /// Next pending line, if any.
    pub fn poll(&self) -> Option<String> {
        match self.lines.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}
