//! Sensor Adapter Capability Interface
//!
//! ## Overview
//!
//! A sensor adapter wraps one physical device behind a uniform contract the
//! registry can drive without knowing what the device is. The contract has
//! one hard guarantee: **an adapter never aborts a tick**. Recoverable device
//! trouble is answered with a fixed fallback value set; only absence of the
//! device at startup removes an adapter from play, permanently.
//!
//! ## Contract
//!
//! - [`update`](SensorAdapter::update) receives the measurements already
//!   produced earlier in the same tick, filtered to the adapter's
//!   [`declared_inputs`](SensorAdapter::declared_inputs). On success it
//!   returns one value per key the adapter owns.
//! - [`fallback`](SensorAdapter::fallback) returns the substitute value set.
//!   Its key set MUST equal the key set a successful update produces, so
//!   consumers never branch on which keys are present.
//! - [`is_connected`](SensorAdapter::is_connected) is decided once, at
//!   construction. A disconnected adapter is skipped every tick and
//!   contributes nothing, not even fallback values.
//!
//! Adapters declare dependencies on earlier adapters' outputs by key. The
//! registry resolves these by registration order alone; if a declared input
//! is missing (upstream disconnected, or upstream itself fell back without
//! producing it), the registry substitutes this adapter's fallback rather
//! than letting it compute on absent data.
//!
//! ## A Closed Set
//!
//! The supported devices are a fixed set of adapter types selected at
//! startup from configuration, not update callbacks injected at runtime.
//! Device I/O enters through per-device bus traits (see [`crate::adapters`]),
//! which is where wire-level protocol decoding stays out of this crate.

use crate::errors::DriverError;
use crate::reading::{Key, Reading, Value};

/// One physical sensor behind the uniform tick contract
pub trait SensorAdapter {
    /// Short stable name, used in log lines
    fn name(&self) -> &'static str;

    /// Whether the device was found at startup
    ///
    /// Decided at construction and never set back to true at runtime.
    fn is_connected(&self) -> bool;

    /// Keys this adapter needs from readings produced earlier in the tick
    fn declared_inputs(&self) -> &'static [Key] {
        &[]
    }

    /// The fixed substitute value set used when the device cannot answer
    ///
    /// Key set must equal the key set of a successful update.
    fn fallback(&self) -> Reading;

    /// Read the device and produce this adapter's measurements
    ///
    /// `context` holds exactly the declared inputs. Any error is recoverable
    /// from the pipeline's point of view; the registry substitutes
    /// [`fallback`](SensorAdapter::fallback) and the tick proceeds.
    fn update(&mut self, context: &Reading) -> Result<Reading, DriverError>;

    /// Accept a calibration value fetched from the collector
    ///
    /// Adapters that use no external reference ignore this. `name` is the
    /// collector-side field name, not a measurement key.
    fn apply_reference(&mut self, name: &str, value: Value) {
        let _ = (name, value);
    }
}
