//! Fixed-capacity telemetry history.
//!
//! Three parallel arrays (soil, temperature, load) share one write index
//! and one `filled` flag. Appends overwrite the oldest sample once the
//! buffer has wrapped; nothing ever allocates after construction.
//!
//! The binary snapshot ([`HistoryRecorder::to_snapshot`]) is a postcard
//! blob tagged with [`HISTORY_MAGIC`] and the capacity it was written
//! with, so a firmware built with a different `N` discards it instead of
//! misreading it.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Default history depth (one sample per log period).
pub const HISTORY_LEN: usize = 240;

/// Snapshot tag. Anything else is treated as foreign data.
pub const HISTORY_MAGIC: u32 = 0xB0B0_B0B0;

/// Stored in the temperature array when no reading was available.
pub const TEMP_MISSING: i16 = i16::MIN;

/// One history point as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistorySample {
    pub soil: u16,
    pub temp_tenths_c: Option<i16>,
    pub load_pct: u8,
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Why a history snapshot could not be produced or restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    /// postcard failed to encode the blob.
    Encode,
    /// Blob truncated or not a history snapshot at all.
    Malformed,
    /// Magic number mismatch.
    BadMagic(u32),
    /// Written by a build with a different history depth.
    CapacityMismatch { expected: usize, found: usize },
    /// Nothing stored yet.
    NotFound,
    /// Underlying storage failed.
    Storage,
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "history encode failed"),
            Self::Malformed => write!(f, "history blob malformed"),
            Self::BadMagic(m) => write!(f, "history magic mismatch: {m:#010x}"),
            Self::CapacityMismatch { expected, found } => {
                write!(f, "history capacity mismatch: expected {expected}, found {found}")
            }
            Self::NotFound => write!(f, "no history stored"),
            Self::Storage => write!(f, "history storage I/O error"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recorder
// ─────────────────────────────────────────────────────────────────────────────

/// Ring buffer of the last `N` samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecorder<const N: usize = HISTORY_LEN> {
    soil: [u16; N],
    temp_tenths_c: [i16; N],
    load_pct: [u8; N],
    /// Next slot to write. Always `< N`.
    index: usize,
    /// Set once the index has wrapped at least once.
    filled: bool,
}

impl<const N: usize> Default for HistoryRecorder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> HistoryRecorder<N> {
    pub const fn new() -> Self {
        const { assert!(N > 0, "history capacity must be non-zero") };
        Self {
            soil: [0; N],
            temp_tenths_c: [TEMP_MISSING; N],
            load_pct: [0; N],
            index: 0,
            filled: false,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of logical samples (`N` once filled).
    pub const fn len(&self) -> usize {
        if self.filled { N } else { self.index }
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn is_filled(&self) -> bool {
        self.filled
    }

    /// Physical slot the next append writes to.
    pub const fn write_index(&self) -> usize {
        self.index
    }

    /// Write a sample, overwriting the oldest one if full.
    pub fn append(&mut self, sample: HistorySample) {
        let i = self.index;
        self.soil[i] = sample.soil;
        self.temp_tenths_c[i] = sample.temp_tenths_c.unwrap_or(TEMP_MISSING);
        self.load_pct[i] = sample.load_pct;

        self.index = (i + 1) % N;
        if self.index == 0 {
            self.filled = true;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Most recent sample, if any.
    pub fn latest(&self) -> Option<HistorySample> {
        self.iter().next_back()
    }

    /// Chronological iterator, oldest first.
    pub fn iter(&self) -> HistoryIter<'_, N> {
        HistoryIter {
            rec: self,
            front: 0,
            back: self.len(),
        }
    }

    fn slot(&self, physical: usize) -> HistorySample {
        let t = self.temp_tenths_c[physical];
        HistorySample {
            soil: self.soil[physical],
            temp_tenths_c: (t != TEMP_MISSING).then_some(t),
            load_pct: self.load_pct[physical],
        }
    }

    /// Logical position -> physical slot.
    const fn physical(&self, logical: usize) -> usize {
        if self.filled { (self.index + logical) % N } else { logical }
    }

    // ── Snapshot ────────────────────────────────────────────────────────────

    /// Encode as a tagged postcard blob.
    pub fn to_snapshot(&self) -> Result<Vec<u8>, HistoryError> {
        let blob = HistoryBlob {
            magic: HISTORY_MAGIC,
            capacity: N as u32,
            index: self.index as u32,
            filled: self.filled,
            soil: self.soil.to_vec(),
            temp_tenths_c: self.temp_tenths_c.to_vec(),
            load_pct: self.load_pct.to_vec(),
        };
        postcard::to_allocvec(&blob).map_err(|_| HistoryError::Encode)
    }

    /// Restore from a blob produced by [`to_snapshot`](Self::to_snapshot).
    pub fn from_snapshot(bytes: &[u8]) -> Result<Self, HistoryError> {
        let blob: HistoryBlob =
            postcard::from_bytes(bytes).map_err(|_| HistoryError::Malformed)?;

        if blob.magic != HISTORY_MAGIC {
            return Err(HistoryError::BadMagic(blob.magic));
        }
        if blob.capacity as usize != N {
            return Err(HistoryError::CapacityMismatch {
                expected: N,
                found: blob.capacity as usize,
            });
        }
        let index = blob.index as usize;
        if index >= N {
            return Err(HistoryError::Malformed);
        }

        let mut rec = Self::new();
        copy_exact(&mut rec.soil, &blob.soil)?;
        copy_exact(&mut rec.temp_tenths_c, &blob.temp_tenths_c)?;
        copy_exact(&mut rec.load_pct, &blob.load_pct)?;
        rec.index = index;
        rec.filled = blob.filled;
        Ok(rec)
    }
}

fn copy_exact<T: Copy>(dst: &mut [T], src: &[T]) -> Result<(), HistoryError> {
    if dst.len() != src.len() {
        return Err(HistoryError::Malformed);
    }
    dst.copy_from_slice(src);
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct HistoryBlob {
    magic: u32,
    capacity: u32,
    index: u32,
    filled: bool,
    soil: Vec<u16>,
    temp_tenths_c: Vec<i16>,
    load_pct: Vec<u8>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Iterator
// ─────────────────────────────────────────────────────────────────────────────

/// Chronological view over a [`HistoryRecorder`]. Cheap to clone, so a
/// caller can walk the same history several times.
#[derive(Debug, Clone)]
pub struct HistoryIter<'a, const N: usize> {
    rec: &'a HistoryRecorder<N>,
    front: usize,
    back: usize,
}

impl<const N: usize> Iterator for HistoryIter<'_, N> {
    type Item = HistorySample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let s = self.rec.slot(self.rec.physical(self.front));
        self.front += 1;
        Some(s)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl<const N: usize> DoubleEndedIterator for HistoryIter<'_, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.rec.slot(self.rec.physical(self.back)))
    }
}

impl<const N: usize> ExactSizeIterator for HistoryIter<'_, N> {}

impl<'a, const N: usize> IntoIterator for &'a HistoryRecorder<N> {
    type Item = HistorySample;
    type IntoIter = HistoryIter<'a, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
