//! CSV audit and soil log adapter.
//!
//! Two append-only streams:
//!
//! ```text
//! events.csv  ts,event,detail
//! soil.csv    ts,soil_adc,pump_on,lockout,on_time_window_ms
//! ```
//!
//! Telemetry points go to the soil log, everything else to the event
//! log. The writers are generic so the same adapter serves files on a
//! mounted filesystem and in-memory buffers in tests.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use log::warn;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

pub const EVENTS_FILE: &str = "events.csv";
pub const SOIL_FILE: &str = "soil.csv";

pub const EVENTS_HEADER: &str = "ts,event,detail";
pub const SOIL_HEADER: &str = "ts,soil_adc,pump_on,lockout,on_time_window_ms";

pub struct CsvEventLog<E, S> {
    events: E,
    soil: S,
    write_errors: u32,
}

impl<E: Write, S: Write> CsvEventLog<E, S> {
    /// Wrap two writers. Headers are written only when `fresh` is set.
    pub fn new(mut events: E, mut soil: S, fresh: bool) -> io::Result<Self> {
        if fresh {
            writeln!(events, "{EVENTS_HEADER}")?;
            writeln!(soil, "{SOIL_HEADER}")?;
        }
        Ok(Self {
            events,
            soil,
            write_errors: 0,
        })
    }

    /// Failed writes since construction.
    pub fn write_errors(&self) -> u32 {
        self.write_errors
    }

    pub fn into_inner(self) -> (E, S) {
        (self.events, self.soil)
    }

    fn record(&mut self, ts_ms: u32, event: &AppEvent) -> io::Result<()> {
        match event {
            AppEvent::Telemetry(t) => {
                // Lost probe is logged as an empty cell.
                let soil = t.soil.map(|s| s.to_string()).unwrap_or_default();
                writeln!(
                    self.soil,
                    "{},{},{},{},{}",
                    ts_ms,
                    soil,
                    u8::from(t.pump_on),
                    u8::from(t.lockout),
                    t.on_time_window_ms
                )?;
                self.soil.flush()
            }
            _ => {
                writeln!(
                    self.events,
                    "{},{},{}",
                    ts_ms,
                    event.name(),
                    escape(&event.detail())
                )?;
                self.events.flush()
            }
        }
    }
}

impl CsvEventLog<File, File> {
    /// Open (or create) both logs in `dir` for appending. A header is
    /// written to each file that is new or empty.
    pub fn open_dir(dir: &Path) -> io::Result<Self> {
        let (events, events_fresh) = open_append(&dir.join(EVENTS_FILE))?;
        let (soil, soil_fresh) = open_append(&dir.join(SOIL_FILE))?;
        let mut log = Self::new(events, soil, false)?;
        if events_fresh {
            writeln!(log.events, "{EVENTS_HEADER}")?;
        }
        if soil_fresh {
            writeln!(log.soil, "{SOIL_HEADER}")?;
        }
        Ok(log)
    }
}

fn open_append(path: &Path) -> io::Result<(File, bool)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let fresh = file.metadata()?.len() == 0;
    Ok((file, fresh))
}

impl<E: Write, S: Write> EventSink for CsvEventLog<E, S> {
    fn emit(&mut self, ts_ms: u32, event: &AppEvent) {
        if let Err(e) = self.record(ts_ms, event) {
            self.write_errors += 1;
            // First failure and then every 100th.
            if self.write_errors % 100 == 1 {
                warn!("csv_log: write failed ({}): {}", self.write_errors, e);
            }
        }
    }
}

/// Quote a CSV field if it contains a separator, quote or newline.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
