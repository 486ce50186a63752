//! Delivery counters shared between producers and the worker

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic delivery counters
#[derive(Debug, Default)]
pub struct DeliveryStats {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    sent: AtomicU64,
    backlogged: AtomicU64,
    evicted: AtomicU64,
    encode_failures: AtomicU64,
    write_failures: AtomicU64,
    connections: AtomicU64,
}

/// Point-in-time copy of [`DeliveryStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Events accepted by the queue
    pub enqueued: u64,
    /// Events rejected because the queue was full or closed
    pub dropped: u64,
    /// Events written to the sink
    pub sent: u64,
    /// Events moved into the backlog
    pub backlogged: u64,
    /// Events evicted from the backlog
    pub evicted: u64,
    /// Events that could not be encoded
    pub encode_failures: u64,
    /// Failed writes
    pub write_failures: u64,
    /// Successful dials
    pub connections: u64,
}

impl DeliveryStats {
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the new total
    pub fn record_sent(&self) -> u64 {
        self.sent.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_backlogged(&self) {
        self.backlogged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, count: usize) {
        self.evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_encode_failure(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            backlogged: self.backlogged.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_records() {
        let stats = DeliveryStats::default();
        stats.record_enqueued();
        stats.record_enqueued();
        stats.record_dropped();
        assert_eq!(stats.record_sent(), 1);
        assert_eq!(stats.record_sent(), 2);
        stats.record_evicted(5);

        let snap = stats.snapshot();
        assert_eq!(snap.enqueued, 2);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.sent, 2);
        assert_eq!(snap.evicted, 5);
        assert_eq!(snap.write_failures, 0);
    }
}
