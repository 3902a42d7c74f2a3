use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
};

use segstore_common::Result;
use segstore_page_alloc::vm;
use segstore_provider::{Segment, StatsSnapshot, StorageProvider, StorageStats};

use crate::validate_segment_size;

/// Maps every segment separately from the operating system.
///
/// Each segment is a fresh reservation of `segment_size` bytes, aligned to
/// `segment_size` and committed read/write. Releasing a segment unmaps it.
///
/// The provider remembers the segments it handed out. Releasing an address it
/// does not know is logged and ignored, and segments still outstanding when the
/// provider is dropped are unmapped then.
pub struct MmapStorageProvider {
    segment_size: usize,
    live: Mutex<HashSet<usize>>,
    stats: StorageStats,
}

impl MmapStorageProvider {
    /// Creates a provider of `segment_size`-byte segments.
    ///
    /// `segment_size` must be a power of two and a multiple of the system page size.
    pub fn new(segment_size: usize) -> Result<MmapStorageProvider> {
        validate_segment_size(segment_size)?;
        Ok(MmapStorageProvider {
            segment_size,
            live: Mutex::new(HashSet::new()),
            stats: StorageStats::new(),
        })
    }

    pub fn segment_size(&self) -> usize {
        self.segment_size
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

    fn map_segment(&self) -> std::io::Result<*mut u8> {
        let ptr = vm::reserve(self.segment_size, self.segment_size)?;
        if let Err(e) = unsafe { vm::commit(ptr, self.segment_size) } {
            let _ = unsafe { vm::release(ptr, self.segment_size, self.segment_size) };
            return Err(e);
        }
        Ok(ptr as *mut u8)
    }

    fn unmap_segment(&self, addr: usize) {
        let ptr = addr as *mut std::ffi::c_void;
        if let Err(e) = unsafe { vm::release(ptr, self.segment_size, self.segment_size) } {
            log::warn!("failed to unmap storage segment at {ptr:?}: {e}");
        }
    }
}

impl StorageProvider for MmapStorageProvider {
    fn acquire(&self, name: &str) -> Option<Segment> {
        let segment = match self.map_segment() {
            Ok(ptr) => {
                self.lock().insert(ptr as usize);
                // SAFETY: the mapping is new and recorded as live exactly once.
                unsafe { Segment::from_ptr(ptr) }
            }
            Err(e) => {
                log::trace!("mmap of segment '{name}' failed: {e}");
                None
            }
        };
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
        self.unmap_segment(segment.addr());
        self.stats.record_release();
    }
}

impl Drop for MmapStorageProvider {
    fn drop(&mut self) {
        let live = std::mem::take(&mut *self.lock());
        if !live.is_empty() {
            log::warn!("unmapping {} storage segments never released", live.len());
        }
        for addr in live {
            self.unmap_segment(addr);
        }
    }
}

impl std::fmt::Debug for MmapStorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapStorageProvider")
            .field("segment_size", &self.segment_size)
            .field("live_segments", &self.live_segments())
            .field("stats", &self.stats())
            .finish()
    }
}
