//! Delivery Channel: Link-Aware, Bounded-Retry Packet Forwarding
//!
//! ## Overview
//!
//! The delivery channel owns the two pieces of connectivity state the rest
//! of the agent cares about and every operation that can change them:
//!
//! ```text
//!   LinkState:        Disconnected → Connecting → Connected
//!                           ↑            │            │
//!                           └────────────┘←───────────┘
//!                         association failed    transport error
//!
//!   CollectorState:   Unknown → Online ⇄ Offline
//! ```
//!
//! The two axes are deliberately separate signals. A dead radio says nothing
//! about the collector's health, and a 500 from the collector says nothing
//! about the radio. Transport-level failures drop `LinkState` (forcing a
//! reassociation before the next request); only an exhausted retry budget or
//! an error response moves `CollectorState` to Offline.
//!
//! ## The Tick Budget Is Structural
//!
//! Sensor acquisition must continue whatever the network does, so every
//! operation here is bounded twice over by one shared [`RetryPolicy`]: a
//! maximum attempt count and a wall-clock deadline measured against the
//! channel's own clock. There is no code path that waits on the network
//! without a bound. When the budget runs out the operation reports failure
//! and the packet stays at the queue head for the next tick; nothing is ever
//! retried within the same tick beyond the policy.
//!
//! ## Side Effects
//!
//! Externally observable effects are limited to logged state transitions and
//! the [`LinkState`]/[`CollectorState`] pair, which a status indicator may
//! render. The channel itself drives no peripherals.

use crate::errors::{LinkError, TransportError};
use crate::packet::SealedPacket;
use crate::reading::Value;
use crate::time::TimeSource;

/// Connectivity of the local network interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No association with the network
    Disconnected,
    /// Association in progress
    Connecting,
    /// Link usable for requests
    Connected,
}

/// Reachability of the remote collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// No request has completed yet
    Unknown,
    /// Last request completed with a valid response
    Online,
    /// Last request exhausted its budget or was rejected
    Offline,
}

/// Network interface association, implemented by the platform layer
pub trait NetworkLink {
    /// Associate with the network; idempotent when already associated
    fn connect(&mut self) -> Result<(), LinkError>;
}

/// Request execution over an associated link, implemented by the platform layer
///
/// Implementations hold the TLS-capable session and its connection pool.
/// Both calls block, bounded by the implementation's own timeout.
pub trait Transport {
    /// GET the URL, returning the body of a success response
    fn get(&mut self, url: &str) -> Result<String, TransportError>;

    /// POST the body to the URL, succeeding on any 2xx response
    fn post(&mut self, url: &str, body: &[u8]) -> Result<(), TransportError>;
}

/// Bounded retry behavior shared by every channel operation
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts per operation before giving up
    pub max_attempts: u32,
    /// Base backoff between attempts in ms, doubled per attempt
    pub backoff_ms: u64,
    /// Wall-clock budget per operation in ms
    pub deadline_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 250,
            deadline_ms: 900,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the next attempt, exponential and capped
    fn backoff_for(&self, attempt: u32) -> u64 {
        let shift = attempt.saturating_sub(1).min(4);
        self.backoff_ms.saturating_mul(1 << shift)
    }
}

/// Collector endpoints the channel talks to
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// POST target for sealed packets
    pub packet_url: String,
    /// GET target for reference values
    pub reference_url: String,
}

/// Counters for delivery health, readable any time
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryStats {
    /// Packets confirmed delivered
    pub packets_sent: u32,
    /// Send operations that gave up
    pub packets_failed: u32,
    /// Payload bytes confirmed delivered
    pub bytes_sent: u64,
    /// Reference fetches that returned a usable value
    pub fetches_ok: u32,
    /// Reference fetches that gave up
    pub fetches_failed: u32,
    /// Successful associations after the first
    pub reconnections: u32,
}

/// Link- and collector-aware delivery over a [`Transport`]
pub struct DeliveryChannel<L, T, C> {
    link: L,
    transport: T,
    clock: C,
    policy: RetryPolicy,
    endpoints: Endpoints,
    link_state: LinkState,
    collector_state: CollectorState,
    ever_connected: bool,
    stats: DeliveryStats,
}

impl<L, T, C> DeliveryChannel<L, T, C>
where
    L: NetworkLink,
    T: Transport,
    C: TimeSource,
{
    /// Create a channel in the Disconnected/Unknown state
    pub fn new(link: L, transport: T, clock: C, endpoints: Endpoints) -> Self {
        Self {
            link,
            transport,
            clock,
            policy: RetryPolicy::default(),
            endpoints,
            link_state: LinkState::Disconnected,
            collector_state: CollectorState::Unknown,
            ever_connected: false,
            stats: DeliveryStats::default(),
        }
    }

    /// Replace the default retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current link state, for the status surface
    pub fn link_state(&self) -> LinkState {
        self.link_state
    }

    /// Current collector state, for the status surface
    pub fn collector_state(&self) -> CollectorState {
        self.collector_state
    }

    /// Delivery counters
    pub fn stats(&self) -> DeliveryStats {
        self.stats
    }

    /// Borrow the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn set_link_state(&mut self, next: LinkState) {
        if self.link_state != next {
            log::info!("delivery: link {:?} -> {:?}", self.link_state, next);
            self.link_state = next;
        }
    }

    fn set_collector_state(&mut self, next: CollectorState) {
        if self.collector_state != next {
            log::info!("delivery: collector {:?} -> {:?}", self.collector_state, next);
            self.collector_state = next;
        }
    }

    /// Associate the link if it is not already up
    ///
    /// Bounded by the policy's attempt count; never spins on a dead radio.
    fn ensure_link(&mut self) -> bool {
        if self.link_state == LinkState::Connected {
            return true;
        }
        self.set_link_state(LinkState::Connecting);

        for attempt in 1..=self.policy.max_attempts {
            match self.link.connect() {
                Ok(()) => {
                    self.set_link_state(LinkState::Connected);
                    if self.ever_connected {
                        self.stats.reconnections += 1;
                    }
                    self.ever_connected = true;
                    return true;
                }
                Err(e) => log::warn!(
                    "delivery: association attempt {attempt}/{} failed: {e}",
                    self.policy.max_attempts
                ),
            }
        }

        self.set_link_state(LinkState::Disconnected);
        false
    }

    fn backoff(&self, attempt: u32) {
        let ms = self.policy.backoff_for(attempt);
        if ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(ms));
        }
    }

    /// Attempt delivery of one sealed packet
    ///
    /// Returns true only on a confirmed success response, in which case the
    /// caller acks the queue head. On false the packet is untouched at the
    /// head and will be retried on a later tick. Never blocks past the
    /// policy bounds.
    pub fn send_packet(&mut self, packet: &SealedPacket) -> bool {
        let body = match packet.to_bytes() {
            Ok(body) => body,
            Err(e) => {
                debug_assert!(false, "sealed packet failed to serialize: {e}");
                log::error!("delivery: packet serialization failed: {e}");
                return false;
            }
        };

        let started = self.clock.now();
        for attempt in 1..=self.policy.max_attempts {
            if self.clock.now().saturating_sub(started) >= self.policy.deadline_ms {
                log::warn!("delivery: send deadline reached, deferring to next tick");
                break;
            }
            if !self.ensure_link() {
                // Collector health is unknowable through a dead link
                self.stats.packets_failed += 1;
                return false;
            }

            match self.transport.post(&self.endpoints.packet_url, &body) {
                Ok(()) => {
                    self.stats.packets_sent += 1;
                    self.stats.bytes_sent += body.len() as u64;
                    self.set_collector_state(CollectorState::Online);
                    return true;
                }
                Err(TransportError::Transport) => {
                    log::warn!("delivery: transport failure during send, link down");
                    self.set_link_state(LinkState::Disconnected);
                    // Reassociation happens at the top of the next attempt
                }
                Err(e) if e.is_retryable() => {
                    log::warn!(
                        "delivery: send attempt {attempt}/{} failed: {e}",
                        self.policy.max_attempts
                    );
                    self.backoff(attempt);
                }
                Err(e) => {
                    log::error!("delivery: send rejected ({e}), not retrying");
                    break;
                }
            }
        }

        self.stats.packets_failed += 1;
        self.set_collector_state(CollectorState::Offline);
        false
    }

    /// Fetch one named reference value from the collector
    ///
    /// Returns None on any failure; the caller keeps its prior value. Same
    /// bounds as [`send_packet`](DeliveryChannel::send_packet).
    pub fn fetch_reference_value(&mut self, field: &str) -> Option<Value> {
        let started = self.clock.now();
        for attempt in 1..=self.policy.max_attempts {
            if self.clock.now().saturating_sub(started) >= self.policy.deadline_ms {
                log::warn!("delivery: fetch deadline reached");
                break;
            }
            if !self.ensure_link() {
                self.stats.fetches_failed += 1;
                return None;
            }

            match self.transport.get(&self.endpoints.reference_url) {
                Ok(body) => match parse_reference(&body, field) {
                    Some(value) => {
                        self.stats.fetches_ok += 1;
                        self.set_collector_state(CollectorState::Online);
                        return Some(value);
                    }
                    None => {
                        log::error!("delivery: reference response has no usable '{field}'");
                        break;
                    }
                },
                Err(TransportError::Transport) => {
                    log::warn!("delivery: transport failure during fetch, link down");
                    self.set_link_state(LinkState::Disconnected);
                }
                Err(e) if e.is_retryable() => {
                    log::warn!(
                        "delivery: fetch attempt {attempt}/{} failed: {e}",
                        self.policy.max_attempts
                    );
                    self.backoff(attempt);
                }
                Err(e) => {
                    log::error!("delivery: fetch rejected ({e}), not retrying");
                    break;
                }
            }
        }

        self.stats.fetches_failed += 1;
        self.set_collector_state(CollectorState::Offline);
        None
    }
}

/// Extract one float field from a reference response body
fn parse_reference(body: &str, field: &str) -> Option<Value> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get(field)?
        .as_f64()
}
