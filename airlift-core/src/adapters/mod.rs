//! The closed set of supported sensor adapters
//!
//! One module per device. Each defines the bus trait the device driver must
//! implement (wire-level decoding stays outside this crate) and the adapter
//! that turns bus samples into measurement keys.

pub mod bme280;
pub mod pm25;
pub mod sgp40;

pub use bme280::{Bme280Adapter, Bme280Bus, Bme280Sample, DEFAULT_SEA_LEVEL_HPA, SEA_LEVEL_REFERENCE};
pub use pm25::{Pm25Adapter, Pm25Bus, Pm25Sample};
pub use sgp40::{Sgp40Adapter, Sgp40Bus};
