use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of a ticker's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickerStats {
    /// Wake-ups that went on to attempt a delivery.
    pub cycles: u64,
    pub delivered: u64,
    /// Ticks discarded because the slot was still occupied.
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    cycles: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_delivered(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TickerStats {
        TickerStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
