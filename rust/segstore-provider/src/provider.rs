use segstore_common::{Result, error::Error};

use crate::Segment;

/// The `StorageProvider` trait hands out fixed-size storage segments to a
/// consumer such as a garbage-collected heap.
///
/// The segment size is part of the provider's configuration rather than a
/// per-call argument. Implementations synchronize internally, so both
/// operations take `&self`.
pub trait StorageProvider: Send + Sync {
    /// Acquires a new storage segment.
    ///
    /// # Arguments
    ///
    /// * `name` - A human-readable label, used only for diagnostics.
    ///
    /// # Returns
    ///
    /// The new segment, or `None` if the allocation could not be satisfied
    /// (e.g. address space exhaustion). Failure is never reported by panicking.
    fn acquire(&self, name: &str) -> Option<Segment>;

    /// Returns a segment to the provider.
    ///
    /// The segment must have been produced by a successful `acquire` on this
    /// same provider instance.
    fn release(&self, segment: Segment);
}

impl<P: StorageProvider + ?Sized> StorageProvider for Box<P> {
    #[inline]
    fn acquire(&self, name: &str) -> Option<Segment> {
        (**self).acquire(name)
    }

    #[inline]
    fn release(&self, segment: Segment) {
        (**self).release(segment)
    }
}

impl<P: StorageProvider + ?Sized> StorageProvider for &P {
    #[inline]
    fn acquire(&self, name: &str) -> Option<Segment> {
        (**self).acquire(name)
    }

    #[inline]
    fn release(&self, segment: Segment) {
        (**self).release(segment)
    }
}

/// Convenience helpers for callers that prefer `Result` over the `None` sentinel.
pub trait StorageProviderExt: StorageProvider {
    /// Acquires a segment, turning a failed acquisition into
    /// [`ErrorKind::AllocationFailed`](segstore_common::error::ErrorKind::AllocationFailed).
    fn acquire_or_err(&self, name: &str) -> Result<Segment> {
        self.acquire(name)
            .ok_or_else(|| Error::allocation_failed(name))
    }
}

impl<P: StorageProvider + ?Sized> StorageProviderExt for P {}
