use segstore_provider::{Segment, StorageProvider, counter::Counter};

/// Caps the number of segments outstanding from a delegate.
///
/// Once `max_segments` segments are live, further acquisitions return `None`
/// without reaching the delegate. Releasing a segment frees up its quota, but
/// the remaining quota never grows past `max_segments`: a release that would push
/// it higher cannot have come from this provider and refunds nothing.
pub struct LimitedStorageProvider<P: StorageProvider = Box<dyn StorageProvider>> {
    delegate: P,
    max_segments: u64,
    remaining: Counter,
}

impl<P: StorageProvider> LimitedStorageProvider<P> {
    pub fn new(delegate: P, max_segments: u64) -> LimitedStorageProvider<P> {
        LimitedStorageProvider {
            delegate,
            max_segments,
            remaining: Counter::new(max_segments),
        }
    }

    pub fn max_segments(&self) -> u64 {
        self.max_segments
    }

    /// Number of segments that can still be acquired before hitting the limit.
    pub fn remaining_segments(&self) -> u64 {
        self.remaining.read()
    }
}

impl<P: StorageProvider> StorageProvider for LimitedStorageProvider<P> {
    fn acquire(&self, name: &str) -> Option<Segment> {
        if !self.remaining.withdraw(1) {
            log::trace!(
                "acquire '{name}' refused: limit of {} segments reached",
                self.max_segments
            );
            return None;
        }
        let segment = self.delegate.acquire(name);
        if segment.is_none() {
            self.remaining.deposit(1);
        }
        segment
    }

    fn release(&self, segment: Segment) {
        let addr = segment.addr();
        self.delegate.release(segment);
        if !self.remaining.deposit_capped(1, self.max_segments) {
            log::error!(
                "released segment {addr:#x} with no outstanding quota (limit {})",
                self.max_segments
            );
        }
    }
}

impl<P: StorageProvider> std::fmt::Debug for LimitedStorageProvider<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitedStorageProvider")
            .field("max_segments", &self.max_segments)
            .field("remaining", &self.remaining_segments())
            .finish_non_exhaustive()
    }
}
