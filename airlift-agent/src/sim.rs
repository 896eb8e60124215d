//! Simulated sensor buses for running the agent on a development host
//!
//! Deterministic waveforms stand in for real devices: slow sine drift on
//! the environmental values and a periodic not-ready fault on the BME280 so
//! the fallback path gets exercised without hardware. Swap these for the
//! real I2C/UART drivers on the target.

use airlift_core::adapters::{Bme280Bus, Bme280Sample, Pm25Bus, Pm25Sample, Sgp40Bus};
use airlift_core::{DriverError, Value};

/// Simulated BME280: slow diurnal drift, not-ready every 97th read
pub struct SimBme280 {
    reads: u64,
}

impl SimBme280 {
    /// Create the simulated device
    pub fn new() -> Self {
        Self { reads: 0 }
    }
}

impl Default for SimBme280 {
    fn default() -> Self {
        Self::new()
    }
}

impl Bme280Bus for SimBme280 {
    fn sample(&mut self) -> Result<Bme280Sample, DriverError> {
        self.reads += 1;
        if self.reads % 97 == 0 {
            return Err(DriverError::NotReady);
        }

        let t = self.reads as f64;
        Ok(Bme280Sample {
            temperature_c: 21.0 + 2.0 * (t / 300.0).sin(),
            relative_humidity: 42.0 + 6.0 * (t / 420.0).sin(),
            pressure_hpa: 985.0 + 3.0 * (t / 900.0).sin(),
        })
    }
}

/// Simulated SGP40: raw signal wobbling around a baseline
pub struct SimSgp40 {
    reads: u64,
    index: i32,
}

impl SimSgp40 {
    /// Create the simulated device
    pub fn new() -> Self {
        Self { reads: 0, index: 100 }
    }
}

impl Default for SimSgp40 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sgp40Bus for SimSgp40 {
    fn measure_raw(&mut self, _temp_c: Value, _humidity: Value) -> Result<i32, DriverError> {
        self.reads += 1;
        let wobble = (self.reads as f64 / 60.0).sin() * 800.0;
        Ok(30_000 + wobble as i32)
    }

    fn voc_index(&mut self, raw: i32) -> i32 {
        // Crude stand-in for the real algorithm: drift toward the deviation
        let target = 100 + (raw - 30_000) / 40;
        self.index += (target - self.index) / 8;
        self.index
    }
}

/// Simulated PM2.5 sensor: clean air with an occasional dust excursion
pub struct SimPm25 {
    reads: u64,
}

impl SimPm25 {
    /// Create the simulated device
    pub fn new() -> Self {
        Self { reads: 0 }
    }
}

impl Default for SimPm25 {
    fn default() -> Self {
        Self::new()
    }
}

impl Pm25Bus for SimPm25 {
    fn read(&mut self) -> Result<Pm25Sample, DriverError> {
        self.reads += 1;
        let excursion = if self.reads % 240 < 20 { 8 } else { 0 };

        Ok(Pm25Sample {
            pm10_standard: 2 + excursion,
            pm25_standard: 4 + excursion,
            pm100_standard: 5 + excursion,
            pm10_env: 2 + excursion,
            pm25_env: 4 + excursion,
            pm100_env: 5 + excursion,
            particles_03um: 700 + 40 * excursion,
            particles_05um: 210 + 12 * excursion,
            particles_10um: 30 + 2 * excursion,
            particles_25um: 2 + excursion / 4,
            particles_50um: 1,
            particles_100um: 0,
        })
    }
}
