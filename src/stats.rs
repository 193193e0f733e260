use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the transport's delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Deliveries handed to a recipient task.
    pub messages_sent: u64,
    /// Deliveries dropped by fault injection.
    pub messages_dropped: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TransportStats {
        TransportStats {
            messages_sent: self.sent.load(Ordering::Relaxed),
            messages_dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
