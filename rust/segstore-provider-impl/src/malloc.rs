use std::{
    alloc::{Layout, alloc_zeroed, dealloc},
    collections::HashSet,
    sync::{Mutex, MutexGuard},
};

use segstore_common::{Result, error::Error};
use segstore_provider::{Segment, StatsSnapshot, StorageProvider, StorageStats};

use crate::validate_segment_size;

/// Takes segments from the global allocator, aligned to the segment size.
///
/// Useful where virtual memory APIs are unavailable or undesirable (e.g. under
/// sanitizers), at the cost of committing every segment in full. Addresses
/// released here that were not handed out by this provider are logged and
/// ignored; outstanding segments are freed when the provider is dropped.
pub struct MallocStorageProvider {
    layout: Layout,
    live: Mutex<HashSet<usize>>,
    stats: StorageStats,
}

impl MallocStorageProvider {
    pub fn new(segment_size: usize) -> Result<MallocStorageProvider> {
        validate_segment_size(segment_size)?;
        let layout = Layout::from_size_align(segment_size, segment_size)
            .map_err(|e| Error::invalid_arg("segment_size", e.to_string()))?;
        Ok(MallocStorageProvider {
            layout,
            live: Mutex::new(HashSet::new()),
            stats: StorageStats::new(),
        })
    }

    pub fn segment_size(&self) -> usize {
        self.layout.size()
    }

    /// Number of segments currently handed out.
    pub fn live_segments(&self) -> usize {
        self.lock().len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<usize>> {
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StorageProvider for MallocStorageProvider {
    fn acquire(&self, name: &str) -> Option<Segment> {
        let ptr = unsafe { alloc_zeroed(self.layout) };
        if !ptr.is_null() {
            self.lock().insert(ptr as usize);
        }
        // SAFETY: a fresh allocation, recorded as live exactly once.
        let segment = unsafe { Segment::from_ptr(ptr) };
        log::trace!("acquire '{name}' -> {segment:?}");
        self.stats.record_acquire(&segment);
        segment
    }

    fn release(&self, segment: Segment) {
        if !self.lock().remove(&segment.addr()) {
            log::error!("released {segment:?}, which is not a live segment of this provider");
            return;
        }
        log::trace!("release {segment:?}");
        unsafe { dealloc(segment.into_non_null().as_ptr(), self.layout) };
        self.stats.record_release();
    }
}

impl Drop for MallocStorageProvider {
    fn drop(&mut self) {
        let live = std::mem::take(&mut *self.lock());
        if !live.is_empty() {
            log::warn!("freeing {} storage segments never released", live.len());
        }
        for addr in live {
            unsafe { dealloc(addr as *mut u8, self.layout) };
        }
    }
}

impl std::fmt::Debug for MallocStorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MallocStorageProvider")
            .field("segment_size", &self.segment_size())
            .field("live_segments", &self.live_segments())
            .field("stats", &self.stats())
            .finish()
    }
}
