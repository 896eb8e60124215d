//! BME280 adapter: temperature, humidity, pressure, derived altitude
//!
//! The altitude column is computed, not measured: the international
//! barometric formula applied to the measured pressure against a sea-level
//! reference pressure. The reference defaults to a deployment constant and
//! is replaced at runtime by the value the collector publishes, when the
//! collector is reachable. A failed fetch leaves the prior reference in
//! effect, so altitude degrades gracefully rather than jumping to nonsense.

use crate::adapter::SensorAdapter;
use crate::errors::DriverError;
use crate::reading::{Key, Reading, Value};

/// Sea-level reference pressure used when the collector was never reachable
pub const DEFAULT_SEA_LEVEL_HPA: Value = 1001.7;

/// Collector-side field name carrying the sea-level reference
pub const SEA_LEVEL_REFERENCE: &str = "sea level";

/// Keys produced on success and in fallback, in wire order
const KEYS: [Key; 4] = ["temp_c", "humidity", "pressure", "altitude_m"];

/// One combined sample off the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bme280Sample {
    /// Air temperature in degrees Celsius
    pub temperature_c: Value,
    /// Relative humidity in percent
    pub relative_humidity: Value,
    /// Station pressure in hPa
    pub pressure_hpa: Value,
}

/// Device access the adapter needs, implemented by the I2C driver
pub trait Bme280Bus {
    /// Take one forced-mode measurement
    fn sample(&mut self) -> Result<Bme280Sample, DriverError>;
}

/// Adapter wrapping one BME280 behind the tick contract
pub struct Bme280Adapter<B> {
    bus: Option<B>,
    sea_level_hpa: Value,
}

impl<B: Bme280Bus> Bme280Adapter<B> {
    /// Wrap the outcome of driver construction
    ///
    /// A construction error permanently disconnects the adapter; the rest of
    /// the pipeline runs without it.
    pub fn new(bus: Result<B, DriverError>) -> Self {
        let bus = match bus {
            Ok(bus) => Some(bus),
            Err(e) => {
                log::warn!("bme280: not found at startup ({e}), disabled");
                None
            }
        };
        Self {
            bus,
            sea_level_hpa: DEFAULT_SEA_LEVEL_HPA,
        }
    }

    /// Current sea-level reference in hPa
    pub fn sea_level_hpa(&self) -> Value {
        self.sea_level_hpa
    }
}

/// International barometric formula, station pressure to meters
fn altitude_m(pressure_hpa: Value, sea_level_hpa: Value) -> Value {
    44_330.0 * (1.0 - libm::pow(pressure_hpa / sea_level_hpa, 0.190_3))
}

impl<B: Bme280Bus> SensorAdapter for Bme280Adapter<B> {
    fn name(&self) -> &'static str {
        "bme280"
    }

    fn is_connected(&self) -> bool {
        self.bus.is_some()
    }

    fn fallback(&self) -> Reading {
        let mut reading = Reading::new();
        reading.insert("temp_c", -40.0);
        reading.insert("humidity", -1.0);
        reading.insert("pressure", -1.0);
        reading.insert("altitude_m", -1.0);
        reading
    }

    fn update(&mut self, _context: &Reading) -> Result<Reading, DriverError> {
        let bus = self.bus.as_mut().ok_or(DriverError::NotFound)?;
        let sample = bus.sample()?;

        let mut reading = Reading::new();
        reading.insert(KEYS[0], sample.temperature_c);
        reading.insert(KEYS[1], sample.relative_humidity);
        reading.insert(KEYS[2], sample.pressure_hpa);
        reading.insert(KEYS[3], altitude_m(sample.pressure_hpa, self.sea_level_hpa));
        Ok(reading)
    }

    fn apply_reference(&mut self, name: &str, value: Value) {
        if name != SEA_LEVEL_REFERENCE {
            return;
        }
        if !value.is_finite() || value <= 0.0 {
            log::warn!("bme280: ignoring unusable sea-level reference {value}");
            return;
        }
        log::info!(
            "bme280: sea-level reference {} -> {} hPa",
            self.sea_level_hpa,
            value
        );
        self.sea_level_hpa = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GoodBus;

    impl Bme280Bus for GoodBus {
        fn sample(&mut self) -> Result<Bme280Sample, DriverError> {
            Ok(Bme280Sample {
                temperature_c: 21.5,
                relative_humidity: 40.0,
                pressure_hpa: 970.0,
            })
        }
    }

    struct DeadBus;

    impl Bme280Bus for DeadBus {
        fn sample(&mut self) -> Result<Bme280Sample, DriverError> {
            Err(DriverError::Timeout)
        }
    }

    #[test]
    fn produces_all_four_keys() {
        let mut adapter = Bme280Adapter::new(Ok(GoodBus));
        let reading = adapter.update(&Reading::new()).unwrap();

        assert_eq!(reading.len(), 4);
        assert_eq!(reading.get("temp_c"), Some(21.5));
        // 970 hPa against the 1001.7 default is roughly 270 m
        let altitude = reading.get("altitude_m").unwrap();
        assert!(altitude > 250.0 && altitude < 290.0, "altitude {altitude}");
    }

    #[test]
    fn fallback_key_set_matches_success() {
        let mut adapter = Bme280Adapter::new(Ok(GoodBus));
        let success = adapter.update(&Reading::new()).unwrap();
        let fallback = adapter.fallback();

        assert_eq!(success.len(), fallback.len());
        for (key, _) in success.iter() {
            assert!(fallback.contains_key(key), "fallback missing {key}");
        }
        assert_eq!(fallback.get("temp_c"), Some(-40.0));
    }

    #[test]
    fn construction_failure_disconnects() {
        let adapter = Bme280Adapter::<GoodBus>::new(Err(DriverError::NotFound));
        assert!(!adapter.is_connected());
    }

    #[test]
    fn read_failure_propagates_to_registry() {
        let mut adapter = Bme280Adapter::new(Ok(DeadBus));
        assert!(adapter.update(&Reading::new()).is_err());
    }

    #[test]
    fn reference_updates_altitude_basis() {
        let mut adapter = Bme280Adapter::new(Ok(GoodBus));
        adapter.apply_reference(SEA_LEVEL_REFERENCE, 1013.25);
        assert_eq!(adapter.sea_level_hpa(), 1013.25);

        // Bad values and foreign names leave the reference alone
        adapter.apply_reference(SEA_LEVEL_REFERENCE, -3.0);
        adapter.apply_reference(SEA_LEVEL_REFERENCE, Value::NAN);
        adapter.apply_reference("dew point", 900.0);
        assert_eq!(adapter.sea_level_hpa(), 1013.25);
    }
}
