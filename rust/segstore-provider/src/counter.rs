use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe unsigned counter shared by the storage providers.
///
/// Used both as a monotonic event counter ([`Counter::increment`]) and as a
/// non-negative quota that consumers withdraw from and deposit back into.
#[derive(Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a new `Counter` with the given initial value.
    pub fn new(value: u64) -> Counter {
        Counter(AtomicU64::new(value))
    }

    /// Adds one to the counter and returns the new value.
    #[inline]
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Attempts to withdraw the specified `amount` from the counter.
    ///
    /// If the current value is greater than or equal to `amount`, the `amount` is
    /// subtracted and `true` is returned. Otherwise the counter remains unchanged
    /// and `false` is returned.
    pub fn withdraw(&self, amount: u64) -> bool {
        let mut current = self.0.load(Ordering::Relaxed);
        while current >= amount {
            match self.0.compare_exchange_weak(
                current,
                current - amount,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(updated) => current = updated,
            }
        }
        false
    }

    /// Deposits the specified `amount` into the counter.
    pub fn deposit(&self, amount: u64) {
        self.0.fetch_add(amount, Ordering::Release);
    }

    /// Deposits `amount` without letting the counter exceed `cap`.
    ///
    /// Returns `false`, leaving the counter unchanged, if the full `amount` does
    /// not fit under `cap`.
    pub fn deposit_capped(&self, amount: u64, cap: u64) -> bool {
        let mut current = self.0.load(Ordering::Relaxed);
        while current.checked_add(amount).is_some_and(|v| v <= cap) {
            match self.0.compare_exchange_weak(
                current,
                current + amount,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(updated) => current = updated,
            }
        }
        false
    }

    /// Returns the counter value (most likely stale by the time it is observed by the caller).
    #[inline]
    pub fn read(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Counter").field(&self.read()).finish()
    }
}
