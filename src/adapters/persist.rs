//! Config and history persistence over any [`StoragePort`].
//!
//! | Key       | Format                            |
//! |-----------|-----------------------------------|
//! | `config`  | `key=value` text, one per line    |
//! | `history` | postcard [`HistoryRecorder`] blob |
//!
//! Both live in the `soilpump` namespace.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, HistoryPort, StorageError, StoragePort};
use crate::config::{PumpConfig, validate};
use crate::history::{HistoryError, HistoryRecorder};

use super::storage::MAX_BLOB_SIZE;

pub const NAMESPACE: &str = "soilpump";
pub const CONFIG_KEY: &str = "config";
pub const HISTORY_KEY: &str = "history";

pub struct Persistence<S> {
    storage: S,
}

impl<S: StoragePort> Persistence<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn read_blob(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let mut buf = vec![0u8; MAX_BLOB_SIZE];
        let n = self.storage.read(NAMESPACE, key, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}

impl<S: StoragePort> ConfigPort for Persistence<S> {
    fn load(&self) -> Result<PumpConfig, ConfigError> {
        let bytes = self.read_blob(CONFIG_KEY)?;
        let text = core::str::from_utf8(&bytes).map_err(|_| ConfigError::Corrupted)?;
        let cfg = validate(PumpConfig::from_kv_text(text));
        info!("persist: config loaded ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&mut self, config: &PumpConfig) -> Result<(), ConfigError> {
        let text = config.to_kv_text();
        self.storage
            .write(NAMESPACE, CONFIG_KEY, text.as_bytes())
            .map_err(|e| {
                warn!("persist: config write failed: {}", e);
                ConfigError::from(e)
            })?;
        info!("persist: config saved ({} bytes)", text.len());
        Ok(())
    }
}

impl<S: StoragePort> HistoryPort for Persistence<S> {
    fn load_history(&self) -> Result<HistoryRecorder, HistoryError> {
        let bytes = self.read_blob(HISTORY_KEY)?;
        HistoryRecorder::from_snapshot(&bytes)
    }

    fn save_history(&mut self, history: &HistoryRecorder) -> Result<(), HistoryError> {
        let bytes = history.to_snapshot()?;
        self.storage.write(NAMESPACE, HISTORY_KEY, &bytes)?;
        info!("persist: history saved ({} samples, {} bytes)", history.len(), bytes.len());
        Ok(())
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::adapters::storage::NvsStorage;
    use crate::config::PumpMode;
    use crate::history::HistorySample;

    fn store() -> Persistence<NvsStorage> {
        Persistence::new(NvsStorage::new().unwrap())
    }

    #[test]
    fn config_missing_is_not_found() {
        assert_eq!(store().load(), Err(ConfigError::NotFound));
    }

    #[test]
    fn config_roundtrip_as_text() {
        let mut p = store();
        let cfg = PumpConfig {
            dry_on: 2800,
            mode: PumpMode::Off,
            ..PumpConfig::default()
        };
        p.save(&cfg).unwrap();

        let mut buf = [0u8; 512];
        let n = p.storage().read(NAMESPACE, CONFIG_KEY, &mut buf).unwrap();
        let text = core::str::from_utf8(&buf[..n]).unwrap();
        assert!(text.contains("dryOn=2800\n"));
        assert!(text.contains("mode=0\n"));

        assert_eq!(p.load().unwrap(), cfg);
    }

    #[test]
    fn hand_edited_config_is_validated_on_load() {
        let mut p = store();
        p.storage_mut()
            .write(NAMESPACE, CONFIG_KEY, b"dryOn=2000\nwetOff=2500\nminOnMs=10\n")
            .unwrap();
        let cfg = p.load().unwrap();
        assert_eq!(cfg.wet_off, 1950);
        assert_eq!(cfg.min_on_ms, 1000);
    }

    #[test]
    fn binary_config_is_corrupted() {
        let mut p = store();
        p.storage_mut()
            .write(NAMESPACE, CONFIG_KEY, &[0xff, 0xfe, 0x00])
            .unwrap();
        assert_eq!(p.load(), Err(ConfigError::Corrupted));
    }

    #[test]
    fn history_roundtrip() {
        let mut p = store();
        let mut h = HistoryRecorder::new();
        for i in 0..300u16 {
            h.append(HistorySample {
                soil: 2000 + i,
                temp_tenths_c: (i % 3 != 0).then_some(200),
                load_pct: (i % 100) as u8,
            });
        }
        p.save_history(&h).unwrap();
        assert_eq!(p.load_history().unwrap(), h);
    }

    #[test]
    fn history_garbage_is_rejected() {
        let mut p = store();
        p.storage_mut()
            .write(NAMESPACE, HISTORY_KEY, b"not a snapshot")
            .unwrap();
        assert!(p.load_history().is_err());
        assert_eq!(store().load_history(), Err(HistoryError::NotFound));
    }
}
