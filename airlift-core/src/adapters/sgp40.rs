//! SGP40 adapter: raw gas reading plus VOC index
//!
//! The SGP40 wants the current temperature and humidity for on-chip
//! compensation, so this adapter declares `temp_c` and `humidity` as inputs
//! and must be registered after the adapter that produces them. The VOC
//! index algorithm is stateful and lives bus-side with the driver; a raw
//! reading below zero is the driver signalling garbage, in which case the
//! index is pinned to -1 without feeding the algorithm.

use crate::adapter::SensorAdapter;
use crate::errors::DriverError;
use crate::reading::{Key, Reading, Value};

const INPUTS: [Key; 2] = ["temp_c", "humidity"];

/// Device access the adapter needs, implemented by the I2C driver
pub trait Sgp40Bus {
    /// One compensated raw measurement
    fn measure_raw(&mut self, temp_c: Value, humidity: Value) -> Result<i32, DriverError>;

    /// Feed one raw value through the stateful VOC index algorithm
    fn voc_index(&mut self, raw: i32) -> i32;
}

/// Adapter wrapping one SGP40 behind the tick contract
pub struct Sgp40Adapter<B> {
    bus: Option<B>,
}

impl<B: Sgp40Bus> Sgp40Adapter<B> {
    /// Wrap the outcome of driver construction
    pub fn new(bus: Result<B, DriverError>) -> Self {
        let bus = match bus {
            Ok(bus) => Some(bus),
            Err(e) => {
                log::warn!("sgp40: not found at startup ({e}), disabled");
                None
            }
        };
        Self { bus }
    }
}

impl<B: Sgp40Bus> SensorAdapter for Sgp40Adapter<B> {
    fn name(&self) -> &'static str {
        "sgp40"
    }

    fn is_connected(&self) -> bool {
        self.bus.is_some()
    }

    fn declared_inputs(&self) -> &'static [Key] {
        &INPUTS
    }

    fn fallback(&self) -> Reading {
        let mut reading = Reading::new();
        reading.insert("sgp40_raw", -1.0);
        reading.insert("voc_index", -1.0);
        reading
    }

    fn update(&mut self, context: &Reading) -> Result<Reading, DriverError> {
        let bus = self.bus.as_mut().ok_or(DriverError::NotFound)?;
        let temp_c = context.get("temp_c").ok_or(DriverError::NotReady)?;
        let humidity = context.get("humidity").ok_or(DriverError::NotReady)?;

        let raw = bus.measure_raw(temp_c, humidity)?;
        let voc = if raw < 0 { -1 } else { bus.voc_index(raw) };

        let mut reading = Reading::new();
        reading.insert("sgp40_raw", raw as Value);
        reading.insert("voc_index", voc as Value);
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedBus {
        raw: i32,
        voc_calls: u32,
    }

    impl Sgp40Bus for ScriptedBus {
        fn measure_raw(&mut self, _temp_c: Value, _humidity: Value) -> Result<i32, DriverError> {
            Ok(self.raw)
        }

        fn voc_index(&mut self, _raw: i32) -> i32 {
            self.voc_calls += 1;
            120
        }
    }

    fn context() -> Reading {
        let mut ctx = Reading::new();
        ctx.insert("temp_c", 21.5);
        ctx.insert("humidity", 40.0);
        ctx
    }

    #[test]
    fn normal_reading_runs_algorithm() {
        let mut adapter = Sgp40Adapter::new(Ok(ScriptedBus { raw: 30_000, voc_calls: 0 }));
        let reading = adapter.update(&context()).unwrap();

        assert_eq!(reading.get("sgp40_raw"), Some(30_000.0));
        assert_eq!(reading.get("voc_index"), Some(120.0));
    }

    #[test]
    fn negative_raw_skips_algorithm() {
        let mut adapter = Sgp40Adapter::new(Ok(ScriptedBus { raw: -7, voc_calls: 0 }));

        let reading = adapter.update(&context()).unwrap();
        assert_eq!(reading.get("voc_index"), Some(-1.0));
        assert_eq!(adapter.bus.as_ref().unwrap().voc_calls, 0);
    }

    #[test]
    fn missing_inputs_fail_the_update() {
        let mut adapter = Sgp40Adapter::new(Ok(ScriptedBus { raw: 100, voc_calls: 0 }));
        let mut ctx = Reading::new();
        ctx.insert("temp_c", 21.5); // humidity absent

        assert_eq!(adapter.update(&ctx).unwrap_err(), DriverError::NotReady);
    }

    #[test]
    fn fallback_key_set_matches_success() {
        let mut adapter = Sgp40Adapter::new(Ok(ScriptedBus { raw: 100, voc_calls: 0 }));
        let success = adapter.update(&context()).unwrap();
        let fallback = adapter.fallback();

        assert_eq!(success.len(), fallback.len());
        for (key, _) in success.iter() {
            assert!(fallback.contains_key(key));
        }
    }
}
