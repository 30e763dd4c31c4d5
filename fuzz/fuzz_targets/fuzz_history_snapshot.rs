//! Fuzz target: history snapshot decoder
//!
//! Feeds arbitrary bytes to `HistoryRecorder::from_snapshot` and checks:
//! - No panics under arbitrary byte inputs
//! - Anything accepted re-encodes to a blob that decodes to the same ring
//! - An accepted ring never holds more than its capacity
//!
//! cargo fuzz run fuzz_history_snapshot

#![no_main]

use libfuzzer_sys::fuzz_target;
use soilpump::history::HistoryRecorder;

fuzz_target!(|data: &[u8]| {
    let Ok(ring) = HistoryRecorder::<16>::from_snapshot(data) else {
        return;
    };
    assert!(ring.len() <= ring.capacity());
    assert_eq!(ring.iter().count(), ring.len());

    let blob = ring.to_snapshot().expect("accepted ring must re-encode");
    let again = HistoryRecorder::<16>::from_snapshot(&blob).expect("re-encoded blob must decode");
    assert_eq!(again, ring);
});
