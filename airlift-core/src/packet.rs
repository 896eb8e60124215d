//! Columnar Packet Accumulator for Transmission-Sized Batches
//!
//! ## Overview
//!
//! Readings arrive once per tick as key/value maps; the collector wants them
//! in bulk. A [`Packet`] accumulates readings column-wise (one bounded vector
//! per measurement key) until it reaches a configured seal threshold, then
//! turns into an immutable [`SealedPacket`] ready for the outbound queue.
//!
//! ```text
//! tick 1: {timestamp: t1, temp_c: 21.5, humidity: 40}
//! tick 2: {timestamp: t2, temp_c: 21.6, humidity: 41}
//! tick 3: {timestamp: t3, temp_c: 21.6}                 humidity missing
//!
//! Packet after 3 appends (size = 3):
//! ┌───────────┬──────┬──────┬──────┐
//! │ timestamp │  t1  │  t2  │  t3  │
//! │ temp_c    │ 21.5 │ 21.6 │ 21.6 │
//! │ humidity  │ 40   │ 41   │ -1   │  ← padded with BACKFILL_VALUE
//! └───────────┴──────┴──────┴──────┘
//! ```
//!
//! ## The Column-Length Invariant
//!
//! Every column in a packet has length equal to the packet's `size`, always.
//! A naive append-or-create accumulator silently desynchronizes columns the
//! first time a tick's key set differs from the previous tick's, and the
//! collector then has no way to line values up with timestamps. Two rules
//! close that hole by construction:
//!
//! - a key first seen mid-packet gets its column backfilled to the current
//!   size with [`BACKFILL_VALUE`] before its first real value lands;
//! - a key absent from the current reading gets [`BACKFILL_VALUE`] appended
//!   so its column keeps pace.
//!
//! The sentinel is `-1.0`, the same convention the sensor fallback tables
//! use, so a consumer sees one "no data" marker per column rather than two.
//!
//! ## Sealing
//!
//! Sealing is one-way and enforced by the type system: [`Packet::seal`]
//! consumes the accumulator and [`SealedPacket`] has no append operation.
//! The seal threshold bounds both the POST payload size and the worst-case
//! device-to-collector latency (threshold x tick period).
//!
//! ## Wire Format
//!
//! A sealed packet serializes to one JSON object mapping each key to its
//! column, `{"timestamp": [...], "temp_c": [...], ...}`. Key order is
//! first-seen order, which is deterministic for a fixed adapter registration
//! order, so downstream consumers can assume a stable schema per deployment.

use heapless::FnvIndexMap;

use crate::errors::PacketError;
use crate::reading::{Key, Reading, Value, MAX_COLUMNS};

/// Maximum readings a single packet can hold
///
/// The seal threshold is clamped to this. 32 readings of 32 f64 columns is
/// ~8 KB of column storage per packet, which keeps even a full outbound
/// queue inside the memory budget of small targets.
pub const COLUMN_CAPACITY: usize = 32;

/// Default seal threshold, in readings
///
/// At a one second tick this bounds device-to-collector latency to under
/// half a minute while keeping POST payloads a few KB.
pub const DEFAULT_SEAL_THRESHOLD: usize = 25;

/// Sentinel appended where a tick produced no value for a known column
pub const BACKFILL_VALUE: Value = -1.0;

type Column = heapless::Vec<Value, COLUMN_CAPACITY>;
type ColumnMap = FnvIndexMap<Key, Column, MAX_COLUMNS>;

/// Mutable columnar accumulator
///
/// Created empty, mutated once per tick via [`append`](Packet::append),
/// consumed by [`seal`](Packet::seal) once [`is_sealed`](Packet::is_sealed)
/// reports the threshold was reached.
#[derive(Debug, Clone)]
pub struct Packet {
    columns: ColumnMap,
    size: usize,
    threshold: usize,
}

impl Packet {
    /// Create an empty packet that seals after `threshold` readings
    ///
    /// The threshold is clamped to `1..=COLUMN_CAPACITY`.
    pub fn new(threshold: usize) -> Self {
        Self {
            columns: FnvIndexMap::new(),
            size: 0,
            threshold: threshold.clamp(1, COLUMN_CAPACITY),
        }
    }

    /// Append one reading, keeping every column the same length
    ///
    /// Keys new to the packet get a column backfilled to the current size;
    /// known keys missing from this reading get the sentinel appended.
    /// Fails only if the packet already reached its threshold (the caller
    /// should have sealed it) or a reading carries more distinct keys than
    /// the column table can hold.
    pub fn append(&mut self, reading: &Reading) -> Result<(), PacketError> {
        if self.size >= self.threshold {
            return Err(PacketError::AtCapacity);
        }

        // Phase one: make sure every key in this reading has a column of
        // length `size` before anything is appended.
        for (&key, _) in reading.iter() {
            if self.columns.contains_key(key) {
                continue;
            }
            let mut column = Column::new();
            for _ in 0..self.size {
                // Cannot fail: size < threshold <= COLUMN_CAPACITY
                let _ = column.push(BACKFILL_VALUE);
            }
            if self.columns.insert(key, column).is_err() {
                return Err(PacketError::ColumnsExhausted);
            }
        }

        // Phase two: extend every column by exactly one value.
        for (key, column) in self.columns.iter_mut() {
            let value = reading.get(key).unwrap_or(BACKFILL_VALUE);
            let _ = column.push(value);
        }
        self.size += 1;

        debug_assert!(
            self.columns.iter().all(|(_, c)| c.len() == self.size),
            "column lengths diverged from packet size"
        );

        Ok(())
    }

    /// Number of readings appended so far
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of distinct columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Whether the packet has reached its seal threshold
    pub fn is_sealed(&self) -> bool {
        self.size >= self.threshold
    }

    /// Consume the accumulator and freeze it for transmission
    ///
    /// One-way: a [`SealedPacket`] has no append operation.
    pub fn seal(self) -> SealedPacket {
        SealedPacket {
            columns: self.columns,
            size: self.size,
        }
    }
}

/// Immutable packet awaiting delivery
///
/// Lives from seal to either confirmed delivery or eviction from the
/// outbound queue. Eviction is explicit, logged data loss, not a crash.
#[derive(Debug, Clone)]
pub struct SealedPacket {
    columns: ColumnMap,
    size: usize,
}

impl SealedPacket {
    /// Number of readings in the packet
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of columns in the packet
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Borrow one column by key
    pub fn column(&self, key: &str) -> Option<&[Value]> {
        self.columns.get(key).map(|c| c.as_slice())
    }

    /// Iterate columns in first-seen key order
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &[Value])> {
        self.columns.iter().map(|(k, c)| (k, c.as_slice()))
    }

    /// Serialize to the JSON wire format
    ///
    /// Deterministic: keys appear in first-seen order, every array has
    /// length equal to [`size`](SealedPacket::size).
    // TODO: run-length encode stable columns so long stretches of unchanged
    // readings cost bytes proportional to the changes, not the ticks.
    #[cfg(feature = "std")]
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(feature = "std")]
impl serde::Serialize for SealedPacket {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (key, column) in self.columns.iter() {
            map.serialize_entry(key, column.as_slice())?;
        }
        map.end()
    }
}
