//! PM2.5 particulate adapter (UART)
//!
//! The UART particulate sensor streams frames continuously and a read can
//! land mid-frame, so a single failed read is routine. The adapter retries
//! the bus a bounded number of times within the tick before declaring the
//! read failed; pacing between attempts is the driver's business. Only after
//! the attempt budget is spent does the failure reach the registry and the
//! fallback values go out.

use crate::adapter::SensorAdapter;
use crate::errors::DriverError;
use crate::reading::{Key, Reading, Value};

/// In-tick read attempts before the adapter reports failure
const READ_ATTEMPTS: u32 = 5;

/// The twelve measurement keys, in wire order
const KEYS: [Key; 12] = [
    "pm10 standard",
    "pm25 standard",
    "pm100 standard",
    "pm10 env",
    "pm25 env",
    "pm100 env",
    "particles 03um",
    "particles 05um",
    "particles 10um",
    "particles 25um",
    "particles 50um",
    "particles 100um",
];

/// One decoded frame off the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pm25Sample {
    /// PM1.0 concentration, standard atmosphere, ug/m3
    pub pm10_standard: u16,
    /// PM2.5 concentration, standard atmosphere, ug/m3
    pub pm25_standard: u16,
    /// PM10 concentration, standard atmosphere, ug/m3
    pub pm100_standard: u16,
    /// PM1.0 concentration, ambient conditions, ug/m3
    pub pm10_env: u16,
    /// PM2.5 concentration, ambient conditions, ug/m3
    pub pm25_env: u16,
    /// PM10 concentration, ambient conditions, ug/m3
    pub pm100_env: u16,
    /// Particles > 0.3um per 0.1L of air
    pub particles_03um: u16,
    /// Particles > 0.5um per 0.1L of air
    pub particles_05um: u16,
    /// Particles > 1.0um per 0.1L of air
    pub particles_10um: u16,
    /// Particles > 2.5um per 0.1L of air
    pub particles_25um: u16,
    /// Particles > 5.0um per 0.1L of air
    pub particles_50um: u16,
    /// Particles > 10um per 0.1L of air
    pub particles_100um: u16,
}

impl Pm25Sample {
    /// Field values in the same order as the measurement keys
    fn values(&self) -> [u16; 12] {
        [
            self.pm10_standard,
            self.pm25_standard,
            self.pm100_standard,
            self.pm10_env,
            self.pm25_env,
            self.pm100_env,
            self.particles_03um,
            self.particles_05um,
            self.particles_10um,
            self.particles_25um,
            self.particles_50um,
            self.particles_100um,
        ]
    }
}

/// Device access the adapter needs, implemented by the UART driver
pub trait Pm25Bus {
    /// Decode the next complete frame
    fn read(&mut self) -> Result<Pm25Sample, DriverError>;
}

/// Adapter wrapping one PM2.5 sensor behind the tick contract
pub struct Pm25Adapter<B> {
    bus: Option<B>,
}

impl<B: Pm25Bus> Pm25Adapter<B> {
    /// Wrap the outcome of driver construction
    pub fn new(bus: Result<B, DriverError>) -> Self {
        let bus = match bus {
            Ok(bus) => Some(bus),
            Err(e) => {
                log::warn!("pm25: not found at startup ({e}), disabled");
                None
            }
        };
        Self { bus }
    }
}

impl<B: Pm25Bus> SensorAdapter for Pm25Adapter<B> {
    fn name(&self) -> &'static str {
        "pm25"
    }

    fn is_connected(&self) -> bool {
        self.bus.is_some()
    }

    fn fallback(&self) -> Reading {
        let mut reading = Reading::new();
        for key in KEYS {
            reading.insert(key, -1.0);
        }
        reading
    }

    fn update(&mut self, _context: &Reading) -> Result<Reading, DriverError> {
        let bus = self.bus.as_mut().ok_or(DriverError::NotFound)?;

        let mut last = DriverError::NotReady;
        for attempt in 1..=READ_ATTEMPTS {
            match bus.read() {
                Ok(sample) => {
                    let mut reading = Reading::new();
                    for (key, value) in KEYS.into_iter().zip(sample.values()) {
                        reading.insert(key, value as Value);
                    }
                    return Ok(reading);
                }
                Err(e) => {
                    log::debug!("pm25: read attempt {attempt}/{READ_ATTEMPTS} failed: {e}");
                    last = e;
                }
            }
        }
        Err(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fails `failures` reads, then succeeds forever
    struct FlakyBus {
        failures: u32,
        reads: u32,
    }

    impl Pm25Bus for FlakyBus {
        fn read(&mut self) -> Result<Pm25Sample, DriverError> {
            self.reads += 1;
            if self.reads <= self.failures {
                Err(DriverError::Checksum)
            } else {
                Ok(Pm25Sample {
                    pm25_standard: 12,
                    particles_03um: 900,
                    ..Default::default()
                })
            }
        }
    }

    #[test]
    fn produces_all_twelve_keys() {
        let mut adapter = Pm25Adapter::new(Ok(FlakyBus { failures: 0, reads: 0 }));
        let reading = adapter.update(&Reading::new()).unwrap();

        assert_eq!(reading.len(), 12);
        assert_eq!(reading.get("pm25 standard"), Some(12.0));
        assert_eq!(reading.get("particles 03um"), Some(900.0));
        assert_eq!(reading.get("pm100 env"), Some(0.0));
    }

    #[test]
    fn retries_within_the_tick() {
        let mut adapter = Pm25Adapter::new(Ok(FlakyBus { failures: 4, reads: 0 }));
        let reading = adapter.update(&Reading::new()).unwrap();
        assert_eq!(reading.get("pm25 standard"), Some(12.0));
    }

    #[test]
    fn attempt_budget_is_bounded() {
        let mut adapter = Pm25Adapter::new(Ok(FlakyBus { failures: u32::MAX, reads: 0 }));
        assert_eq!(adapter.update(&Reading::new()).unwrap_err(), DriverError::Checksum);
        assert_eq!(adapter.bus.as_ref().unwrap().reads, READ_ATTEMPTS);
    }

    #[test]
    fn fallback_key_set_matches_success() {
        let mut adapter = Pm25Adapter::new(Ok(FlakyBus { failures: 0, reads: 0 }));
        let success = adapter.update(&Reading::new()).unwrap();
        let fallback = adapter.fallback();

        assert_eq!(success.len(), fallback.len());
        for (key, _) in success.iter() {
            assert!(fallback.contains_key(key));
            assert_eq!(fallback.get(key), Some(-1.0));
        }
    }
}
