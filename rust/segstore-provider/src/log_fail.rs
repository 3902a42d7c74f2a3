//! `LogFailStorageProvider`: a pass-through provider that counts failed acquisitions.

use crate::{Segment, StorageProvider, counter::Counter};

/// Wraps a [`StorageProvider`] and records how many of its acquisitions failed.
///
/// Every `acquire` and `release` is forwarded to the wrapped delegate unchanged,
/// and the delegate's result is returned as is. The only added behavior is the
/// failure count, readable at any time through
/// [`failed_allocation_count`](Self::failed_allocation_count). The wrapper never
/// retries, never falls back to another provider and never allocates on its own.
///
/// The delegate is owned exclusively and dropped together with the wrapper.
pub struct LogFailStorageProvider<P: StorageProvider = Box<dyn StorageProvider>> {
    delegate: P,
    failed_allocations: Counter,
}

impl<P: StorageProvider> LogFailStorageProvider<P> {
    /// Takes ownership of `delegate`. The failure count starts at zero.
    pub fn new(delegate: P) -> LogFailStorageProvider<P> {
        LogFailStorageProvider {
            delegate,
            failed_allocations: Counter::default(),
        }
    }

    /// Number of `acquire` calls on this instance that returned `None`.
    ///
    /// Safe to call concurrently with `acquire`; the value may already be stale
    /// when the caller observes it.
    #[inline]
    pub fn failed_allocation_count(&self) -> u64 {
        self.failed_allocations.read()
    }
}

impl<P: StorageProvider> StorageProvider for LogFailStorageProvider<P> {
    fn acquire(&self, name: &str) -> Option<Segment> {
        let segment = self.delegate.acquire(name);
        if segment.is_none() {
            let failures = self.failed_allocations.increment();
            log::debug!("failed to acquire storage segment '{name}' ({failures} failures so far)");
        }
        segment
    }

    #[inline]
    fn release(&self, segment: Segment) {
        self.delegate.release(segment);
    }
}

impl<P: StorageProvider> std::fmt::Debug for LogFailStorageProvider<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFailStorageProvider")
            .field("failed_allocations", &self.failed_allocation_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    /// Hands out fake addresses from a counter, failing every `fail_every`-th call.
    struct FakeProvider {
        calls: AtomicUsize,
        fail_every: usize,
        released: Arc<AtomicUsize>,
        dropped: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn new(fail_every: usize) -> FakeProvider {
            FakeProvider {
                calls: AtomicUsize::new(0),
                fail_every,
                released: Default::default(),
                dropped: Default::default(),
            }
        }
    }

    impl StorageProvider for FakeProvider {
        fn acquire(&self, _name: &str) -> Option<Segment> {
            let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
            if self.fail_every != 0 && call.is_multiple_of(self.fail_every) {
                None
            } else {
                // Never dereferenced; each call yields a distinct address.
                unsafe { Segment::from_ptr(std::ptr::without_provenance_mut(call * 0x1000)) }
            }
        }

        fn release(&self, _segment: Segment) {
            self.released.fetch_add(1, Ordering::Relaxed);
        }
    }

    impl Drop for FakeProvider {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_counts_failures() {
        let provider = LogFailStorageProvider::new(FakeProvider::new(3));
        let mut counts = vec![];
        let mut segments = vec![];
        for _ in 0..7 {
            if let Some(segment) = provider.acquire("segment") {
                segments.push(segment);
            }
            counts.push(provider.failed_allocation_count());
        }
        assert_eq!(counts, vec![0, 0, 1, 1, 1, 2, 2]);
        assert_eq!(
            segments.iter().map(Segment::addr).collect::<Vec<_>>(),
            vec![0x1000, 0x2000, 0x4000, 0x5000, 0x7000]
        );
    }

    #[test]
    fn test_release_forwards_without_counting() {
        let fake = FakeProvider::new(2);
        let released = fake.released.clone();
        let provider = LogFailStorageProvider::new(fake);

        let segment = provider.acquire("a").unwrap();
        assert!(provider.acquire("b").is_none());
        assert_eq!(provider.failed_allocation_count(), 1);

        provider.release(segment);
        assert_eq!(released.load(Ordering::Relaxed), 1);
        assert_eq!(provider.failed_allocation_count(), 1);
    }

    #[test]
    fn test_drops_delegate() {
        let fake = FakeProvider::new(0);
        let dropped = fake.dropped.clone();
        let provider = LogFailStorageProvider::new(fake);
        let _segment = provider.acquire("a").unwrap();
        assert_eq!(dropped.load(Ordering::Relaxed), 0);
        drop(provider);
        assert_eq!(dropped.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_boxed_delegate() {
        let delegate: Box<dyn StorageProvider> = Box::new(FakeProvider::new(1));
        let provider: LogFailStorageProvider = LogFailStorageProvider::new(delegate);
        assert!(provider.acquire("a").is_none());
        assert!(provider.acquire("b").is_none());
        assert_eq!(provider.failed_allocation_count(), 2);
        assert_eq!(
            format!("{provider:?}"),
            "LogFailStorageProvider { failed_allocations: 2, .. }"
        );
    }

    #[test]
    fn test_nested() {
        let inner = LogFailStorageProvider::new(FakeProvider::new(2));
        let outer = LogFailStorageProvider::new(&inner);
        for _ in 0..4 {
            let _ = outer.acquire("a");
        }
        assert_eq!(outer.failed_allocation_count(), 2);
        assert_eq!(inner.failed_allocation_count(), 2);
    }
}
