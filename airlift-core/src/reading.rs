//! Reading: the merged sensor output of one tick
//!
//! A [`Reading`] is an insertion-ordered, bounded map from measurement key to
//! numeric value. It is created at the start of a tick, filled by the sensor
//! registry, consumed by the packet accumulator, and dropped before the next
//! tick starts.
//!
//! Insertion order matters: it is what makes packet column order (and thus
//! the wire schema) deterministic across a deployment. The registry inserts
//! the timestamp key first and then walks adapters in registration order, so
//! two devices with the same configuration emit byte-identical schemas.

use heapless::FnvIndexMap;

/// Stable string identifier for one scalar quantity (e.g. `"temp_c"`)
///
/// Keys are sensor-defined and may overlap across sensors; a collision within
/// a tick is last-write-wins.
pub type Key = &'static str;

/// Measurement value
///
/// `f64` rather than `f32` because millisecond timestamps share the column
/// type with sensor values and must not lose precision.
pub type Value = f64;

/// Maximum distinct measurement keys per tick (and per packet)
///
/// Must be a power of two for the underlying index map. The reference
/// deployment produces 19 keys; 32 leaves room without inviting sprawl.
pub const MAX_COLUMNS: usize = 32;

/// Key under which the registry records the tick timestamp
pub const TIMESTAMP_KEY: Key = "timestamp";

/// One tick's worth of merged measurements
///
/// Bounded and heap-free. Iteration yields entries in first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct Reading {
    values: FnvIndexMap<Key, Value, MAX_COLUMNS>,
}

impl Reading {
    /// Create an empty reading
    pub fn new() -> Self {
        Self {
            values: FnvIndexMap::new(),
        }
    }

    /// Insert a value, replacing any previous value for the key
    ///
    /// Returns `false` if the key was new and the map is full, in which case
    /// the value is dropped. Re-inserting an existing key always succeeds and
    /// keeps the key's original position.
    pub fn insert(&mut self, key: Key, value: Value) -> bool {
        self.values.insert(key, value).is_ok()
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).copied()
    }

    /// Whether the reading contains the key
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the reading holds no entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate entries in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.values.iter()
    }

    /// Merge another reading into this one, last-write-wins on collision
    ///
    /// Returns the number of entries dropped because the map was full.
    pub fn merge(&mut self, other: &Reading) -> usize {
        let mut dropped = 0;
        for (&key, &value) in other.iter() {
            if !self.insert(key, value) {
                dropped += 1;
            }
        }
        dropped
    }

    /// Build a new reading containing only the named keys that are present
    ///
    /// Used by the registry to hand each adapter exactly the inputs it
    /// declared. Keys absent from this reading are simply not copied; the
    /// caller compares lengths to detect missing inputs.
    pub fn subset(&self, keys: &[Key]) -> Reading {
        let mut out = Reading::new();
        for &key in keys {
            if let Some(value) = self.get(key) {
                out.insert(key, value);
            }
        }
        out
    }
}
