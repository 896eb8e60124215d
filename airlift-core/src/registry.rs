//! Ordered Sensor Registry: one tick, one merged Reading
//!
//! ## Overview
//!
//! The registry owns the adapters and drives them once per tick, in
//! registration order. Ordering doubles as dependency resolution: an adapter
//! that declares inputs gets them from adapters registered before it, so a
//! deployment expresses its dependency graph simply by registering producers
//! ahead of consumers. No graph solver, no cycles possible.
//!
//! ## Guarantees
//!
//! [`tick`](SensorRegistry::tick) never fails and never panics on adapter
//! trouble:
//!
//! - the timestamp key is inserted before any adapter runs, so every reading
//!   carries it and it is always the first packet column;
//! - a disconnected adapter is skipped outright and contributes nothing;
//! - an adapter whose declared inputs are incomplete (upstream disconnected
//!   or upstream fell back without producing them) is not run at all; its
//!   fallback goes into the reading instead;
//! - an adapter whose update errors contributes its fallback;
//! - key collisions between adapters resolve last-write-wins.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};

use crate::adapter::SensorAdapter;
use crate::reading::{Reading, Value, TIMESTAMP_KEY};
use crate::time::Timestamp;

/// Counters for registry health, readable any time
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryStats {
    /// Ticks driven since startup
    pub ticks: u32,
    /// Updates answered with fallback values
    pub fallbacks: u32,
    /// Updates skipped because declared inputs were missing
    pub missing_inputs: u32,
    /// Values dropped because a reading's key table was full
    pub dropped_keys: u32,
}

/// Ordered collection of sensor adapters
pub struct SensorRegistry {
    adapters: Vec<Box<dyn SensorAdapter>>,
    stats: RegistryStats,
}

impl SensorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
            stats: RegistryStats::default(),
        }
    }

    /// Append an adapter; position determines tick order
    pub fn register(&mut self, adapter: Box<dyn SensorAdapter>) {
        if !adapter.is_connected() {
            log::warn!("registry: {} registered disconnected", adapter.name());
        }
        self.adapters.push(adapter);
    }

    /// Number of registered adapters, connected or not
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether no adapters are registered
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Number of adapters that found their device at startup
    pub fn connected_count(&self) -> usize {
        self.adapters.iter().filter(|a| a.is_connected()).count()
    }

    /// Registry counters
    pub fn stats(&self) -> RegistryStats {
        self.stats
    }

    /// Run one acquisition pass and merge all outputs
    pub fn tick(&mut self, now: Timestamp) -> Reading {
        self.stats.ticks = self.stats.ticks.wrapping_add(1);

        let mut merged = Reading::new();
        merged.insert(TIMESTAMP_KEY, now as Value);

        for adapter in self.adapters.iter_mut() {
            if !adapter.is_connected() {
                continue;
            }

            let inputs = adapter.declared_inputs();
            let context = merged.subset(inputs);

            let output = if context.len() < inputs.len() {
                log::warn!(
                    "registry: {} missing {} of {} inputs, using fallback",
                    adapter.name(),
                    inputs.len() - context.len(),
                    inputs.len()
                );
                self.stats.missing_inputs += 1;
                self.stats.fallbacks += 1;
                adapter.fallback()
            } else {
                match adapter.update(&context) {
                    Ok(reading) => reading,
                    Err(e) => {
                        log::warn!("registry: {} update failed ({e}), using fallback", adapter.name());
                        self.stats.fallbacks += 1;
                        adapter.fallback()
                    }
                }
            };

            let dropped = merged.merge(&output);
            if dropped > 0 {
                log::error!(
                    "registry: {} values from {} dropped, key table full",
                    dropped,
                    adapter.name()
                );
                self.stats.dropped_keys += dropped as u32;
            }
        }

        merged
    }

    /// Broadcast a calibration value to every adapter
    ///
    /// Adapters that do not recognize the reference name ignore it.
    pub fn apply_reference(&mut self, name: &str, value: Value) {
        for adapter in self.adapters.iter_mut() {
            adapter.apply_reference(name, value);
        }
    }
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
