//! Fixed-Period Scheduler Loop
//!
//! ## Overview
//!
//! Single-threaded, cooperative, one fixed-period tick. Each tick runs the
//! same five steps in the same order:
//!
//! ```text
//! ┌─ tick start (monotonic) ──────────────────────────────────┐
//! │ 1. registry.tick()        acquire + merge sensor readings │
//! │ 2. packet.append()        accumulate into current packet  │
//! │ 3. seal? → queue.enqueue  threshold reached, fresh packet │
//! │ 4. one send attempt       queue head only, never more     │
//! │ 5. sleep(period−elapsed)  clamped at zero                 │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Acquisition and delivery are strictly sequenced within the tick: the
//! device has one network interface and little memory, and interleaving
//! would buy nothing for the synchronization machinery it would cost.
//!
//! Scheduling is drift-compensated fixed-rate: the sleep is the remainder of
//! the nominal period after the work, so tick N+1 starts one period after
//! tick N started, not one period after it ended. A tick that overruns the
//! period is followed immediately by the next, with no compounding delay.
//!
//! The loop never terminates on a downstream failure. Sensors answer with
//! fallbacks, sends answer with false, the queue evicts rather than grows.
//! The only legitimate exit is external.

use core::mem;

use crate::adapters::bme280::SEA_LEVEL_REFERENCE;
use crate::delivery::{CollectorState, DeliveryChannel, LinkState, NetworkLink, Transport};
use crate::packet::Packet;
use crate::queue::OutboundQueue;
use crate::registry::SensorRegistry;
use crate::time::TimeSource;

/// Tunables for the scheduler loop
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Nominal tick period in ms
    pub tick_period_ms: u64,
    /// Readings per packet before sealing
    pub seal_threshold: usize,
    /// Ticks between reference-value refreshes, 0 disables periodic refresh
    pub calibration_interval_ticks: u64,
    /// Ticks between status log lines, 0 disables them
    pub status_interval_ticks: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 1_000,
            seal_threshold: crate::packet::DEFAULT_SEAL_THRESHOLD,
            calibration_interval_ticks: 3_600,
            status_interval_ticks: 50,
        }
    }
}

/// The agent's main loop: owns every pipeline component
///
/// `Q` is the outbound queue capacity in packets.
pub struct Scheduler<L, T, C, const Q: usize> {
    registry: SensorRegistry,
    packet: Packet,
    queue: OutboundQueue<Q>,
    delivery: DeliveryChannel<L, T, C>,
    clock: C,
    config: SchedulerConfig,
    ticks: u64,
}

impl<L, T, C, const Q: usize> Scheduler<L, T, C, Q>
where
    L: NetworkLink,
    T: Transport,
    C: TimeSource,
{
    /// Assemble a scheduler from its components
    ///
    /// `clock` supplies both the reading timestamps and the drift math.
    /// Monotonic and wall-clock sources both work: the drift math only
    /// subtracts nearby values, and the timestamp column simply carries
    /// whatever the source reports.
    pub fn new(
        registry: SensorRegistry,
        delivery: DeliveryChannel<L, T, C>,
        clock: C,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            registry,
            packet: Packet::new(config.seal_threshold),
            queue: OutboundQueue::new(),
            delivery,
            clock,
            config,
            ticks: 0,
        }
    }

    /// Ticks driven since startup
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Current outbound queue depth
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Link state passthrough, for the status surface
    pub fn link_state(&self) -> LinkState {
        self.delivery.link_state()
    }

    /// Collector state passthrough, for the status surface
    pub fn collector_state(&self) -> CollectorState {
        self.delivery.collector_state()
    }

    /// Queue counters passthrough
    pub fn queue_stats(&self) -> crate::queue::QueueStats {
        self.queue.stats()
    }

    /// Borrow the delivery channel, for status surfaces and inspection
    pub fn delivery(&self) -> &DeliveryChannel<L, T, C> {
        &self.delivery
    }

    /// Fetch the sea-level reference and broadcast it to the adapters
    ///
    /// A failed fetch changes nothing; the prior calibration stays in
    /// effect.
    pub fn refresh_reference(&mut self) {
        if let Some(value) = self.delivery.fetch_reference_value(SEA_LEVEL_REFERENCE) {
            self.registry.apply_reference(SEA_LEVEL_REFERENCE, value);
        }
    }

    /// Run exactly one tick, without sleeping
    ///
    /// Exposed separately from [`run`](Scheduler::run) so tests and callers
    /// with their own pacing can drive the pipeline directly.
    pub fn tick(&mut self) {
        self.ticks += 1;

        // 1-2: acquire and accumulate
        let reading = self.registry.tick(self.clock.now());
        if let Err(e) = self.packet.append(&reading) {
            // Unreachable when sealing below keeps pace; a defect, not a condition
            debug_assert!(false, "packet append failed: {e}");
            log::error!("scheduler: packet append failed ({e}), reading dropped");
        }

        // 3: seal and hand off
        if self.packet.is_sealed() {
            let fresh = Packet::new(self.config.seal_threshold);
            let sealed = mem::replace(&mut self.packet, fresh).seal();
            log::debug!(
                "scheduler: packet sealed ({} readings, {} columns), queue depth {}",
                sealed.size(),
                sealed.column_count(),
                self.queue.len() + 1
            );
            self.queue.enqueue(sealed);
        }

        // 4: at most one send attempt per tick keeps tick latency bounded
        let delivered = match self.queue.peek_oldest() {
            Some(head) => self.delivery.send_packet(head),
            None => false,
        };
        if delivered {
            self.queue.ack_oldest();
        }

        if self.config.status_interval_ticks > 0 && self.ticks % self.config.status_interval_ticks == 0
        {
            self.log_status();
        }
        if self.config.calibration_interval_ticks > 0
            && self.ticks % self.config.calibration_interval_ticks == 0
        {
            self.refresh_reference();
        }
    }

    /// Run the loop forever at the configured cadence
    ///
    /// Fetches the reference value once up front, then ticks until the
    /// process is stopped externally.
    pub fn run(&mut self) -> ! {
        log::info!(
            "scheduler: starting, period {} ms, seal threshold {}, queue capacity {}",
            self.config.tick_period_ms,
            self.config.seal_threshold,
            Q
        );
        self.refresh_reference();

        loop {
            let started = self.clock.now();
            self.tick();
            let elapsed = self.clock.now().saturating_sub(started);

            let remainder = sleep_remainder(self.config.tick_period_ms, elapsed);
            if remainder > 0 {
                std::thread::sleep(std::time::Duration::from_millis(remainder));
            } else {
                log::warn!(
                    "scheduler: tick {} overran the period ({} ms elapsed)",
                    self.ticks,
                    elapsed
                );
            }
        }
    }

    fn log_status(&self) {
        let queue_stats = self.queue.stats();
        let registry_stats = self.registry.stats();
        log::info!(
            "status: tick {} link {:?} collector {:?} queue {}/{} delivered {} lost {} fallbacks {}",
            self.ticks,
            self.delivery.link_state(),
            self.delivery.collector_state(),
            self.queue.len(),
            Q,
            queue_stats.delivered,
            queue_stats.readings_lost,
            registry_stats.fallbacks,
        );
    }
}

/// Remainder of the nominal period after a tick's work, clamped at zero
///
/// Zero means the tick overran and the next one starts immediately.
pub fn sleep_remainder(period_ms: u64, elapsed_ms: u64) -> u64 {
    period_ms.saturating_sub(elapsed_ms)
}
