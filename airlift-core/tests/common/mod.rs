//! Shared fixtures for integration tests
//!
//! Scripted stand-ins for the three seams the pipeline consumes: sensor
//! buses, the network link, and the transport.

#![allow(dead_code)]

use std::collections::VecDeque;

use airlift_core::adapters::{Bme280Bus, Bme280Sample, Pm25Bus, Pm25Sample, Sgp40Bus};
use airlift_core::{
    DriverError, Endpoints, LinkError, NetworkLink, RetryPolicy, Transport, TransportError, Value,
};

/// BME280 bus producing fixed values, optionally failing every `fail_every`th read
pub struct SimBme280 {
    pub reads: u32,
    pub fail_every: u32,
}

impl SimBme280 {
    pub fn steady() -> Self {
        Self { reads: 0, fail_every: 0 }
    }
}

impl Bme280Bus for SimBme280 {
    fn sample(&mut self) -> Result<Bme280Sample, DriverError> {
        self.reads += 1;
        if self.fail_every > 0 && self.reads % self.fail_every == 0 {
            return Err(DriverError::NotReady);
        }
        Ok(Bme280Sample {
            temperature_c: 21.5,
            relative_humidity: 40.0,
            pressure_hpa: 970.0,
        })
    }
}

/// SGP40 bus with a fixed raw reading and a trivial index
pub struct SimSgp40;

impl Sgp40Bus for SimSgp40 {
    fn measure_raw(&mut self, _temp_c: Value, _humidity: Value) -> Result<i32, DriverError> {
        Ok(30_000)
    }

    fn voc_index(&mut self, _raw: i32) -> i32 {
        100
    }
}

/// PM2.5 bus producing one fixed frame
pub struct SimPm25;

impl Pm25Bus for SimPm25 {
    fn read(&mut self) -> Result<Pm25Sample, DriverError> {
        Ok(Pm25Sample {
            pm10_standard: 3,
            pm25_standard: 5,
            pm100_standard: 6,
            pm10_env: 3,
            pm25_env: 5,
            pm100_env: 6,
            particles_03um: 900,
            particles_05um: 260,
            particles_10um: 40,
            particles_25um: 4,
            particles_50um: 1,
            particles_100um: 0,
        })
    }
}

/// Link that follows a script, then stays up
pub struct ScriptedLink {
    outcomes: VecDeque<Result<(), LinkError>>,
}

impl ScriptedLink {
    pub fn up() -> Self {
        Self { outcomes: VecDeque::new() }
    }

    pub fn script(outcomes: &[Result<(), LinkError>]) -> Self {
        Self { outcomes: outcomes.iter().copied().collect() }
    }
}

impl NetworkLink for ScriptedLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        self.outcomes.pop_front().unwrap_or(Ok(()))
    }
}

/// Transport that records every POST body and follows a script of outcomes
///
/// An exhausted script means success, so a test can script a few failures
/// and let the rest of the run deliver.
pub struct RecordingTransport {
    pub post_outcomes: VecDeque<Result<(), TransportError>>,
    pub get_bodies: VecDeque<String>,
    pub posted: Vec<Vec<u8>>,
    pub post_attempts: u32,
    pub always_fail: Option<TransportError>,
}

impl RecordingTransport {
    pub fn delivering() -> Self {
        Self {
            post_outcomes: VecDeque::new(),
            get_bodies: VecDeque::new(),
            posted: Vec::new(),
            post_attempts: 0,
            always_fail: None,
        }
    }

    /// Every POST fails with the given error, forever
    pub fn always_failing(error: TransportError) -> Self {
        Self {
            always_fail: Some(error),
            ..Self::delivering()
        }
    }

    pub fn failing_posts(mut self, outcomes: &[Result<(), TransportError>]) -> Self {
        self.post_outcomes = outcomes.iter().copied().collect();
        self
    }

    pub fn with_reference_body(mut self, body: &str) -> Self {
        self.get_bodies.push_back(body.to_string());
        self
    }
}

impl Transport for RecordingTransport {
    fn get(&mut self, _url: &str) -> Result<String, TransportError> {
        self.get_bodies
            .pop_front()
            .ok_or(TransportError::OutOfRetries)
    }

    fn post(&mut self, _url: &str, body: &[u8]) -> Result<(), TransportError> {
        self.post_attempts += 1;
        if let Some(e) = self.always_fail {
            return Err(e);
        }
        match self.post_outcomes.pop_front() {
            Some(Ok(())) | None => {
                self.posted.push(body.to_vec());
                Ok(())
            }
            Some(Err(e)) => Err(e),
        }
    }
}

pub fn endpoints() -> Endpoints {
    Endpoints {
        packet_url: "http://collector.local/enviornmental_sensors".into(),
        reference_url: "http://collector.local/api/weather_status".into(),
    }
}

/// Retry policy without real sleeps, for fast tests
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff_ms: 0,
        deadline_ms: 10_000,
    }
}
