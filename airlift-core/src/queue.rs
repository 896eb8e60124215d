//! Bounded Outbound Queue with Drop-Oldest Eviction
//!
//! ## Overview
//!
//! Sealed packets wait here for delivery. The queue is the only thing
//! standing between a dead collector and the device's RAM, so its capacity
//! is a compile-time bound and eviction is explicit: pushing into a full
//! queue removes the oldest packet, logs one loss event carrying the number
//! of readings discarded, and bumps the loss counters. Losing old data to
//! keep recent data is the intended trade on a device that cannot page.
//!
//! ```text
//! enqueue →  [ P5 ][ P4 ][ P3 ][ P2 ][ P1 ]  → peek_oldest / ack_oldest
//!                                      ↑
//!                    full? P1 evicted, loss event logged
//! ```
//!
//! ## Head-of-Line Delivery
//!
//! `peek_oldest` and `ack_oldest` are split so the delivery channel can
//! retry one packet across many ticks without the queue ever duplicating or
//! reordering state: the head stays put until a send is confirmed, at most
//! one packet is in flight, and eviction can never touch a packet mid-send
//! because sends complete within the tick that started them.
//!
//! ## Threading
//!
//! Touched only by the scheduler thread. If acquisition and delivery are
//! ever split across threads this type must move behind a mutex or an SPSC
//! channel; it deliberately has no interior mutability to hide that.

use heapless::Deque;

use crate::packet::SealedPacket;

/// Counters for queue health and data loss, readable any time
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    /// Packets accepted into the queue
    pub enqueued: u32,
    /// Packets removed after confirmed delivery
    pub delivered: u32,
    /// Packets evicted to make room
    pub evicted: u32,
    /// Readings lost to eviction (sum of evicted packet sizes)
    pub readings_lost: u32,
}

/// Bounded FIFO of sealed packets awaiting delivery
///
/// `N` is the hard capacity; length never exceeds it.
pub struct OutboundQueue<const N: usize> {
    packets: Deque<SealedPacket, N>,
    stats: QueueStats,
}

impl<const N: usize> OutboundQueue<N> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            packets: Deque::new(),
            stats: QueueStats::default(),
        }
    }

    /// Append a packet, evicting the oldest if the queue is full
    ///
    /// Returns the evicted packet, if any, after accounting for it as loss.
    pub fn enqueue(&mut self, packet: SealedPacket) -> Option<SealedPacket> {
        let evicted = if self.packets.is_full() {
            self.packets.pop_front()
        } else {
            None
        };

        if let Some(lost) = &evicted {
            self.stats.evicted += 1;
            self.stats.readings_lost += lost.size() as u32;
            log::warn!(
                "queue: full at {}, dropped oldest packet ({} readings lost)",
                N,
                lost.size()
            );
        }

        // Cannot fail: a slot was just freed if none was available
        let _ = self.packets.push_back(packet);
        self.stats.enqueued += 1;

        evicted
    }

    /// Borrow the oldest packet without removing it
    pub fn peek_oldest(&self) -> Option<&SealedPacket> {
        self.packets.front()
    }

    /// Remove the oldest packet after its delivery was confirmed
    pub fn ack_oldest(&mut self) -> Option<SealedPacket> {
        let acked = self.packets.pop_front();
        if acked.is_some() {
            self.stats.delivered += 1;
        }
        acked
    }

    /// Current number of queued packets
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Whether the queue holds no packets
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Whether the next enqueue would evict
    pub fn is_full(&self) -> bool {
        self.packets.is_full()
    }

    /// Queue counters
    pub fn stats(&self) -> QueueStats {
        self.stats
    }
}

impl<const N: usize> Default for OutboundQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;
    use crate::reading::Reading;

    /// Sealed packet with `n` readings of one column, first value `tag`
    fn sealed(tag: f64, n: usize) -> SealedPacket {
        let mut packet = Packet::new(n);
        for i in 0..n {
            let mut r = Reading::new();
            r.insert("v", tag + i as f64);
            packet.append(&r).unwrap();
        }
        packet.seal()
    }

    fn head_tag<const N: usize>(queue: &OutboundQueue<N>) -> f64 {
        queue.peek_oldest().unwrap().column("v").unwrap()[0]
    }

    #[test]
    fn fifo_order() {
        let mut queue = OutboundQueue::<4>::new();
        queue.enqueue(sealed(10.0, 1));
        queue.enqueue(sealed(20.0, 1));

        assert_eq!(queue.len(), 2);
        assert_eq!(head_tag(&queue), 10.0);

        let acked = queue.ack_oldest().unwrap();
        assert_eq!(acked.column("v").unwrap()[0], 10.0);
        assert_eq!(head_tag(&queue), 20.0);
    }

    #[test]
    fn peek_does_not_remove() {
        let mut queue = OutboundQueue::<2>::new();
        queue.enqueue(sealed(10.0, 1));

        assert!(queue.peek_oldest().is_some());
        assert!(queue.peek_oldest().is_some());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn eviction_removes_exactly_the_oldest() {
        let mut queue = OutboundQueue::<2>::new();
        queue.enqueue(sealed(10.0, 3));
        queue.enqueue(sealed(20.0, 3));

        let evicted = queue.enqueue(sealed(30.0, 3)).unwrap();
        assert_eq!(evicted.column("v").unwrap()[0], 10.0);

        assert_eq!(queue.len(), 2);
        assert_eq!(head_tag(&queue), 20.0);
    }

    #[test]
    fn loss_accounting_counts_readings() {
        let mut queue = OutboundQueue::<1>::new();
        queue.enqueue(sealed(10.0, 5));
        queue.enqueue(sealed(20.0, 5));

        let stats = queue.stats();
        assert_eq!(stats.evicted, 1);
        assert_eq!(stats.readings_lost, 5);
        assert_eq!(stats.enqueued, 2);
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let mut queue = OutboundQueue::<2>::new();
        for i in 0..10 {
            queue.enqueue(sealed(i as f64, 1));
            assert!(queue.len() <= 2);
        }
        assert_eq!(queue.stats().evicted, 8);
    }

    #[test]
    fn ack_on_empty_is_a_no_op() {
        let mut queue = OutboundQueue::<2>::new();
        assert!(queue.ack_oldest().is_none());
        assert_eq!(queue.stats().delivered, 0);
    }
}
