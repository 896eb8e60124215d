//! Error Types for the Acquisition and Delivery Pipeline
//!
//! ## Design Philosophy
//!
//! Errors here follow the same rules as the rest of the core:
//!
//! 1. **Small Size**: Every variant is a few bytes at most. Errors travel
//!    through hot per-tick paths and must not bloat return values.
//!
//! 2. **No Heap Allocation**: No `String` payloads. Status codes and attempt
//!    counts are carried inline; anything richer belongs in a log line at the
//!    point of failure.
//!
//! 3. **Copy Semantics**: All error enums implement `Copy` so they can be
//!    returned, matched, and stored in counters without move gymnastics.
//!
//! ## Error Taxonomy
//!
//! The pipeline distinguishes four failure domains, each with its own type:
//!
//! - [`DriverError`] - a sensor device misbehaved during a read. Always
//!   recoverable: the owning adapter substitutes its fallback values and the
//!   tick proceeds.
//! - [`LinkError`] - the local network interface failed to associate.
//!   Recoverable: the delivery channel reconnects lazily on the next use.
//! - [`TransportError`] - a request over an associated link failed. The
//!   variants matter: `Transport` is a link-level signal, `Status` is the
//!   collector answering with an error, and `OutOfRetries` is the session
//!   layer reporting that its own internal retries ran dry. Callers must
//!   handle all three distinctly.
//! - [`PacketError`] - a columnar invariant would have been violated. These
//!   are prevented by construction; observing one at runtime is a defect in
//!   the caller, not a condition to recover from.
//!
//! Nothing in this module is fatal. The scheduler loop never terminates on a
//! downstream failure.

use thiserror_no_std::Error;

/// Sensor device errors surfaced by bus implementations
///
/// Any of these during a read is masked by the adapter's fallback values.
/// `NotFound` at construction time instead disables the adapter for the
/// process lifetime.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// Bus transaction failed (NAK, arbitration loss, framing error)
    #[error("bus transaction failed")]
    Bus,

    /// Device answered but had no fresh measurement ready
    #[error("device not ready")]
    NotReady,

    /// Payload arrived but its checksum did not match
    #[error("checksum mismatch")]
    Checksum,

    /// Device did not answer within the bus timeout
    #[error("device timed out")]
    Timeout,

    /// Device absent at the expected address
    #[error("device not found")]
    NotFound,
}

/// Network interface association errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Association with the access point or carrier failed
    #[error("link association failed")]
    AssociationFailed,

    /// No usable network interface present
    #[error("no network interface")]
    NoInterface,
}

/// Request errors surfaced by transport implementations
///
/// `Transport` and `OutOfRetries` are distinct on purpose: the first means
/// the link itself broke mid-request, the second means the session layer
/// kept the link but gave up after its own bounded retries.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Link-level failure mid-request (socket reset, TLS teardown, DNS)
    #[error("transport-level failure")]
    Transport,

    /// The session layer exhausted its internal retry budget
    #[error("session out of retries")]
    OutOfRetries,

    /// The collector answered with a non-success status
    #[error("server returned status {0}")]
    Status(u16),

    /// Response arrived but the body was unusable
    #[error("response body unusable")]
    Malformed,
}

impl TransportError {
    /// Whether a retry within the same call could plausibly succeed
    ///
    /// Server overload (5xx) and throttling (429) are worth another attempt;
    /// other statuses mean the request itself is wrong and retrying is waste.
    pub const fn is_retryable(&self) -> bool {
        match self {
            TransportError::Transport => true,
            TransportError::OutOfRetries => true,
            TransportError::Status(code) => *code >= 500 || *code == 429,
            TransportError::Malformed => false,
        }
    }
}

/// Columnar packet invariant violations
///
/// Prevented by construction in normal operation. Treat any occurrence as a
/// defect to fix, not a runtime condition to handle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// Append was called on a packet that already reached its seal threshold
    #[error("packet already at seal threshold")]
    AtCapacity,

    /// A reading introduced more distinct keys than a packet can hold
    #[error("column table exhausted")]
    ColumnsExhausted,
}

#[cfg(feature = "defmt")]
impl defmt::Format for DriverError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Bus => defmt::write!(fmt, "bus transaction failed"),
            Self::NotReady => defmt::write!(fmt, "device not ready"),
            Self::Checksum => defmt::write!(fmt, "checksum mismatch"),
            Self::Timeout => defmt::write!(fmt, "device timed out"),
            Self::NotFound => defmt::write!(fmt, "device not found"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TransportError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Transport => defmt::write!(fmt, "transport failure"),
            Self::OutOfRetries => defmt::write!(fmt, "session out of retries"),
            Self::Status(code) => defmt::write!(fmt, "server status {}", code),
            Self::Malformed => defmt::write!(fmt, "body unusable"),
        }
    }
}
