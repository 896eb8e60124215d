//! Core telemetry pipeline for Airlift
//!
//! Polls heterogeneous environmental sensors on a fixed cadence, accumulates
//! readings into transmission-sized columnar packets, and hands sealed packets
//! to a delivery channel that survives prolonged link or collector outages
//! without exhausting memory.
//!
//! Key constraints:
//! - Runs on devices with tens of KB of RAM and no process-level fault isolation
//! - Every buffer is bounded at compile time
//! - No operation may stall the acquisition cadence indefinitely
//!
//! ```no_run
//! use airlift_core::{Packet, Reading, TIMESTAMP_KEY};
//!
//! let mut packet = Packet::new(25);
//!
//! let mut reading = Reading::new();
//! reading.insert(TIMESTAMP_KEY, 1_000.0);
//! reading.insert("temp_c", 21.5);
//!
//! packet.append(&reading).unwrap();
//! if packet.is_sealed() {
//!     let sealed = packet.seal();
//!     // hand off to the outbound queue
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod adapter;
pub mod adapters;
pub mod errors;
pub mod packet;
pub mod queue;
pub mod reading;
pub mod registry;
pub mod time;

#[cfg(feature = "std")]
pub mod delivery;
#[cfg(feature = "std")]
pub mod scheduler;

// Public API
pub use adapter::SensorAdapter;
pub use errors::{DriverError, LinkError, PacketError, TransportError};
pub use packet::{Packet, SealedPacket, BACKFILL_VALUE, DEFAULT_SEAL_THRESHOLD};
pub use queue::OutboundQueue;
pub use reading::{Key, Reading, Value, MAX_COLUMNS, TIMESTAMP_KEY};
pub use registry::SensorRegistry;
pub use time::{TimeSource, Timestamp};

#[cfg(feature = "std")]
pub use delivery::{
    CollectorState, DeliveryChannel, Endpoints, LinkState, NetworkLink, RetryPolicy, Transport,
};
#[cfg(feature = "std")]
pub use scheduler::{Scheduler, SchedulerConfig};

/// Crate version string, for agent banners and user-agent headers.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
