use std::time::Duration;

/// Internal metrics tracking.
#[derive(Debug, Default)]
pub(crate) struct PoolMetricsInner {
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub open_failures: u64,
    pub checkouts: u64,
    pub timeouts: u64,
    pub evicted: u64,
    pub sweeps: u64,
}

/// Counters accumulated over the pool's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolMetrics {
    /// Total connections opened.
    pub connections_opened: u64,
    /// Total connections closed (evicted, discarded on release, or disposed).
    pub connections_closed: u64,
    /// Connection opens that failed.
    pub open_failures: u64,
    /// Total successful checkouts.
    pub checkouts: u64,
    /// Acquisitions that gave up waiting.
    pub timeouts: u64,
    /// Idle channels removed by maintenance.
    pub evicted: u64,
    /// Maintenance sweeps run, by timer, counters, or explicit call.
    pub sweeps: u64,
    /// Time since the pool was created.
    pub uptime: Duration,
}

/// A snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub available: usize,
    pub checked_out: usize,
    pub max_size: usize,
}

impl PoolStatus {
    #[must_use]
    pub fn total(&self) -> usize {
        self.available + self.checked_out
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.total() == 0
    }
}
