//! Per-provider acquisition and release statistics.

use crate::{Segment, counter::Counter};

/// Atomic event counts kept by a concrete storage provider.
#[derive(Debug, Default)]
pub struct StorageStats {
    succeeded: Counter,
    failed: Counter,
    released: Counter,
}

impl StorageStats {
    pub fn new() -> StorageStats {
        Default::default()
    }

    /// Records the outcome of one `acquire` call.
    #[inline]
    pub fn record_acquire(&self, result: &Option<Segment>) {
        if result.is_some() {
            self.succeeded.increment();
        } else {
            self.failed.increment();
        }
    }

    #[inline]
    pub fn record_release(&self) {
        self.released.increment();
    }

    /// Returns a point-in-time copy of the counts.
    ///
    /// The individual counts are read one after another, so under concurrent use
    /// the snapshot may mix values from slightly different moments.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            succeeded: self.succeeded.read(),
            failed: self.failed.read(),
            released: self.released.read(),
        }
    }
}

/// A copy of [`StorageStats`] suitable for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StatsSnapshot {
    /// Number of successful acquisitions.
    pub succeeded: u64,
    /// Number of failed acquisitions.
    pub failed: u64,
    /// Number of released segments.
    pub released: u64,
}

impl StatsSnapshot {
    /// Number of segments acquired and not yet released.
    pub fn live(&self) -> u64 {
        self.succeeded.saturating_sub(self.released)
    }
}
