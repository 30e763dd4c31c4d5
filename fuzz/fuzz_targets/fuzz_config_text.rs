//! Fuzz target: `key=value` config parser
//!
//! Hand-edited config files can contain anything. Checks that parsing
//! never panics and that validation always produces a usable config.
//!
//! cargo fuzz run fuzz_config_text

#![no_main]

use libfuzzer_sys::fuzz_target;
use soilpump::config::{PumpConfig, validate};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let cfg = validate(PumpConfig::from_kv_text(text));
    assert!(cfg.is_valid());
    assert!(cfg.dry_on > cfg.wet_off);

    // The persisted form reads back unchanged.
    assert_eq!(PumpConfig::from_kv_text(&cfg.to_kv_text()), cfg);
});
